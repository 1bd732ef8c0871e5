use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::Token;
use crate::config::{CircleCiConfig, Config};
use crate::error::DeployLensError;
use crate::output::WatchRenderer;
use crate::poller::{PollOutcome, PolledSnapshot, SnapshotSource, StatusPoller};
use crate::providers::circleci::{CircleCiClient, CircleCiProvider};
use crate::server::{self, StatusApiClient, StatusState};
use crate::session::DeploySession;
use crate::snapshot::{PipelineId, StatusResponse, WorkflowStatus, MISSING_PARAMETERS};

#[derive(Parser)]
#[command(name = "deploylens")]
#[command(author, version, about = "CircleCI deployment watcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./deploylens.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one snapshot of a pipeline as JSON
    Status {
        #[arg(short = 'i', long)]
        pipeline_id: String,

        #[command(flatten)]
        circleci: CircleCiArgs,
    },
    /// Follow a pipeline until its workflow finishes
    Watch {
        #[arg(short = 'i', long)]
        pipeline_id: String,

        /// Poll a running `deploylens serve` instead of CircleCI
        #[arg(short, long)]
        server: Option<String>,

        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,

        #[command(flatten)]
        circleci: CircleCiArgs,
    },
    /// Serve `GET /status?pipelineId=<id>`
    Serve {
        #[arg(short, long)]
        bind: Option<String>,

        #[command(flatten)]
        circleci: CircleCiArgs,
    },
    /// Write the effective settings to a configuration file
    Init {
        #[arg(default_value = "deploylens.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,

        #[command(flatten)]
        circleci: CircleCiArgs,
    },
}

#[derive(Args, Debug, Default)]
struct CircleCiArgs {
    #[arg(short, long, env = "CIRCLECI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// CircleCI host
    #[arg(short, long)]
    url: Option<String>,

    /// Project path such as 'org/site', tried under the gh/ and github/ prefixes
    #[arg(short = 'P', long, env = "CIRCLECI_PROJECT")]
    project: Option<String>,

    /// Explicit v1.1 project slug; repeat to try several in order
    #[arg(long = "slug")]
    slugs: Vec<String>,
}

impl CircleCiArgs {
    /// Flags and environment override the configuration file.
    fn merge(&self, file: &CircleCiConfig) -> CircleCiConfig {
        let mut settings = file.clone();

        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        if let Some(url) = &self.url {
            settings.base_url = url.clone();
        }
        if !self.slugs.is_empty() {
            settings.project_slugs = self.slugs.clone();
        } else if let Some(project) = &self.project {
            settings.project = Some(project.clone());
            settings.project_slugs.clear();
        }

        settings
    }
}

fn token(settings: &CircleCiConfig) -> Option<Token> {
    settings
        .token
        .as_deref()
        .map(Token::from)
        .filter(|token| !token.as_str().is_empty())
}

fn build_provider(settings: &CircleCiConfig, token: Token) -> Result<CircleCiProvider> {
    let client =
        CircleCiClient::new(&settings.base_url, Some(token), settings.client_options())?;

    let slugs = settings.candidate_slugs();
    if slugs.is_empty() {
        warn!("No CircleCI project configured; job steps and logs cannot be fetched");
    } else {
        info!("Project slugs: {}", slugs.join(", "));
    }

    Ok(CircleCiProvider::new(client, slugs))
}

/// Settings written by `init`. The token is never persisted.
fn settings_to_save(config: &Config, args: &CircleCiArgs) -> Config {
    let mut config = config.clone();
    config.circleci = args.merge(&config.circleci);
    config.circleci.token = None;
    config
}

enum WatchUpdate {
    Snapshot(PolledSnapshot),
    Error(DeployLensError),
}

impl Cli {
    fn write_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Snapshot written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }

    async fn execute_status(
        &self,
        config: &Config,
        pipeline_id: &str,
        args: &CircleCiArgs,
    ) -> Result<ExitCode> {
        let settings = args.merge(&config.circleci);
        let pipeline_id = PipelineId::from(pipeline_id.trim());

        let response = match token(&settings) {
            Some(token) if !pipeline_id.as_str().is_empty() => {
                let provider = build_provider(&settings, token)?;
                match provider.build_snapshot(&pipeline_id).await {
                    Ok(snapshot) => StatusResponse::from(snapshot),
                    Err(e) => {
                        warn!("Status for pipeline {pipeline_id} unavailable: {e}");
                        StatusResponse::from(&e)
                    }
                }
            }
            _ => StatusResponse::failure(MISSING_PARAMETERS),
        };

        self.write_json(&response)?;

        Ok(if response.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    async fn execute_watch(
        &self,
        config: &Config,
        pipeline_id: &str,
        server: Option<&str>,
        interval: Option<u64>,
        args: &CircleCiArgs,
    ) -> Result<ExitCode> {
        let settings = args.merge(&config.circleci);
        let pipeline_id = PipelineId::from(pipeline_id.trim());
        if pipeline_id.as_str().is_empty() {
            bail!("{MISSING_PARAMETERS}");
        }

        let source: Arc<dyn SnapshotSource> = match server {
            Some(url) => {
                info!("Watching pipeline {pipeline_id} through {url}");
                Arc::new(StatusApiClient::new(url, settings.request_timeout())?)
            }
            None => {
                let Some(token) = token(&settings) else {
                    bail!("{MISSING_PARAMETERS}");
                };
                info!("Watching pipeline {pipeline_id} on {}", settings.base_url);
                Arc::new(build_provider(&settings, token)?)
            }
        };

        let interval = interval
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or_else(|| config.poller.interval());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let error_tx = tx.clone();
        let handle = StatusPoller::new(source, interval).start(
            pipeline_id.clone(),
            move |polled| {
                let _ = tx.send(WatchUpdate::Snapshot(polled));
            },
            move |error| {
                let _ = error_tx.send(WatchUpdate::Error(error));
            },
        );

        let mut session = DeploySession::new();
        let mut renderer = WatchRenderer::new();
        renderer.waiting(pipeline_id.as_str());

        // The channel closes once the poll loop has ended and dropped its callbacks.
        loop {
            tokio::select! {
                update = rx.recv() => match update {
                    Some(WatchUpdate::Snapshot(polled)) => {
                        if session.apply(polled) {
                            renderer.render(&session);
                        }
                    }
                    Some(WatchUpdate::Error(error)) => {
                        warn!("Poll failed: {error}");
                        session.record_error(&error);
                        renderer.render(&session);
                    }
                    None => break,
                },
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl-C: {e}");
                    }
                    info!("Interrupted, stopping poller");
                    handle.stop();
                }
            }
        }

        match handle.finished().await {
            PollOutcome::Completed { polls } => info!("Workflow finished after {polls} polls"),
            PollOutcome::Cancelled => info!("Poller cancelled"),
        }

        renderer.finish(&session);

        if let Some(snapshot) = session.snapshot() {
            if self.output.is_some() {
                self.write_json(&StatusResponse::from(snapshot.clone()))?;
            }
        }

        Ok(match session.snapshot().map(|s| &s.workflow.status) {
            Some(WorkflowStatus::Success) => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        })
    }

    async fn execute_serve(
        &self,
        config: &Config,
        bind: Option<&str>,
        args: &CircleCiArgs,
    ) -> Result<ExitCode> {
        let settings = args.merge(&config.circleci);

        let address = match bind {
            Some(bind) => bind
                .parse()
                .with_context(|| format!("Invalid bind address: {bind}"))?,
            None => config.server.socket_addr()?,
        };

        let source: Option<Arc<dyn SnapshotSource>> = match token(&settings) {
            Some(token) => {
                let provider: Arc<dyn SnapshotSource> =
                    Arc::new(build_provider(&settings, token)?);
                Some(provider)
            }
            None => {
                warn!("CIRCLECI_TOKEN is not set; every request will be rejected");
                None
            }
        };

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
            signal.cancel();
        });

        server::serve(address, StatusState::new(source), shutdown).await?;

        Ok(ExitCode::SUCCESS)
    }

    fn execute_init(
        &self,
        config: &Config,
        path: &Path,
        force: bool,
        args: &CircleCiArgs,
    ) -> Result<ExitCode> {
        if path.exists() && !force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                path.display()
            );
        }

        settings_to_save(config, args).save(path)?;
        info!("Configuration written to: {}", path.display());

        Ok(ExitCode::SUCCESS)
    }

    pub async fn execute(&self) -> Result<ExitCode> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Status {
                pipeline_id,
                circleci,
            } => self.execute_status(&config, pipeline_id, circleci).await,
            Commands::Watch {
                pipeline_id,
                server,
                interval,
                circleci,
            } => {
                self.execute_watch(&config, pipeline_id, server.as_deref(), *interval, circleci)
                    .await
            }
            Commands::Serve { bind, circleci } => {
                self.execute_serve(&config, bind.as_deref(), circleci).await
            }
            Commands::Init {
                path,
                force,
                circleci,
            } => self.execute_init(&config, path, *force, circleci),
        }
    }
}
