use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_yellow};

/// Spinner shown while no snapshot is available yet.
pub struct WaitingSpinner {
    pb: ProgressBar,
}

impl WaitingSpinner {
    pub fn start(message: &str) -> Self {
        Self {
            pb: create_spinner(bright_yellow(message).to_string()),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(bright_yellow(message).to_string());
    }

    pub fn finish(self, message: &str) {
        self.pb
            .finish_with_message(bright_green(format!("{message} ✓")).to_string());
    }

    pub fn clear(self) {
        self.pb.finish_and_clear();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
