use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use deploylens::cli::Cli;
use deploylens::output;
use log::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting DeployLens - CircleCI deployment watcher");
    let code = cli.execute().await?;

    Ok(code)
}
