mod progress;
mod styling;
mod tables;
mod watch;

pub use styling::{dim, magenta_bold};
pub use tables::jobs_table;
pub use watch::WatchRenderer;

/// Prints the `DeployLens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚀 DeployLens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CircleCI deployment watcher")
    );
}
