use log::{debug, warn};
use serde_json::Value;

use super::client::CircleCiClient;
use super::types::LegacyStep;
use crate::error::{DeployLensError, Result};
use crate::snapshot::{Action, FetchStatus, Job, Step, STEP_STILL_RUNNING};

/// Steps, logs and fetch outcome resolved for one job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobDetail {
    pub raw_steps: Vec<Value>,
    pub steps: Vec<Step>,
    pub full_log: String,
    pub fetch_status: FetchStatus,
    pub fetch_error: Option<String>,
}

impl JobDetail {
    fn with_status(fetch_status: FetchStatus) -> Self {
        Self {
            fetch_status,
            ..Self::default()
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            fetch_error: Some(error.into()),
            ..Self::with_status(FetchStatus::Failed)
        }
    }
}

/// Enriches a v2 job with v1.1 steps and action logs.
pub async fn resolve_job(client: &CircleCiClient, mut job: Job, slugs: &[String]) -> Job {
    let detail = resolve(client, &job, slugs).await;
    job.raw_steps = detail.raw_steps;
    job.steps = detail.steps;
    job.full_log = detail.full_log;
    job.fetch_status = detail.fetch_status;
    job.fetch_error = detail.fetch_error;
    job
}

/// Resolves a job's steps by trying each candidate slug in order.
///
/// Jobs that have not started are answered without any request. The first
/// slug returning a non-empty step list wins and later slugs are never tried.
pub async fn resolve(client: &CircleCiClient, job: &Job, slugs: &[String]) -> JobDetail {
    if job.status.is_not_started() {
        return JobDetail::with_status(FetchStatus::NotStarted);
    }

    let Some(job_number) = job.job_number else {
        warn!("Job '{}' has no job number, cannot fetch its steps", job.name);
        return JobDetail::failed("Job has no job number");
    };

    let (raw_steps, legacy_steps) = match first_usable_steps(client, job_number, slugs).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Job '{}': {e}", job.name);
            return JobDetail::failed(e.to_string());
        }
    };

    let mut steps = Vec::new();
    let mut full_log = String::new();

    for legacy_step in legacy_steps {
        if legacy_step.actions.is_empty() {
            continue;
        }

        let mut step = Step {
            name: legacy_step.name,
            status: legacy_step.status,
            actions: Vec::with_capacity(legacy_step.actions.len()),
            logs: String::new(),
        };

        for legacy_action in legacy_step.actions {
            let status = legacy_action.status.unwrap_or_default();
            let output = match legacy_action.output_url.as_deref() {
                Some(output_url) => {
                    let text = client.fetch_log(output_url).await;
                    step.logs.push_str(&text);
                    full_log.push_str(&text);
                    text
                }
                None if status == "running" => STEP_STILL_RUNNING.to_string(),
                None => String::new(),
            };

            step.actions.push(Action {
                name: legacy_action.name,
                status,
                kind: legacy_action.kind.unwrap_or_default(),
                output,
                output_url: legacy_action.output_url,
            });
        }

        steps.push(step);
    }

    JobDetail {
        raw_steps,
        steps,
        full_log,
        fetch_status: FetchStatus::Success,
        fetch_error: None,
    }
}

/// Sequential short-circuit search over candidate slugs.
async fn first_usable_steps(
    client: &CircleCiClient,
    job_number: u64,
    slugs: &[String],
) -> Result<(Vec<Value>, Vec<LegacyStep>)> {
    for slug in slugs {
        let steps = match client.fetch_job_detail(slug, job_number).await {
            Ok(detail) => detail.steps.unwrap_or_default(),
            Err(e) => {
                debug!("No v1.1 data for {slug} job #{job_number}: {e}");
                continue;
            }
        };

        if steps.is_empty() {
            debug!("No steps for {slug} job #{job_number}");
            continue;
        }

        match serde_json::from_value::<Vec<LegacyStep>>(Value::Array(steps.clone())) {
            Ok(legacy_steps) => {
                debug!("Resolved job #{job_number} via {slug}");
                return Ok((steps, legacy_steps));
            }
            Err(e) => debug!("Unreadable steps for {slug} job #{job_number}: {e}"),
        }
    }

    Err(DeployLensError::FetchFailed {
        job_number,
        attempts: slugs.len(),
    })
}
