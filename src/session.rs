//! Per-session view of a deployment being watched.

use crate::error::DeployLensError;
use crate::logs::{extract_deployment_urls, project_log_lines, DeploymentUrls};
use crate::poller::PolledSnapshot;
use crate::snapshot::RunSnapshot;

/// Everything one dashboard session derives from its own snapshots.
///
/// Each session owns its state; two sessions watching different pipelines,
/// or the same one, never see each other's values.
#[derive(Debug, Default)]
pub struct DeploySession {
    latest: Option<PolledSnapshot>,
    log_lines: Vec<String>,
    urls: DeploymentUrls,
    last_error: Option<String>,
}

impl DeploySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all derived state with what `polled` describes.
    ///
    /// Snapshots older than the current one are ignored.
    pub fn apply(&mut self, polled: PolledSnapshot) -> bool {
        if let Some(latest) = &self.latest {
            if polled.sequence <= latest.sequence {
                return false;
            }
        }

        self.log_lines = project_log_lines(&polled.snapshot.jobs);
        self.urls = extract_deployment_urls(&self.log_lines);
        self.last_error = None;
        self.latest = Some(polled);
        true
    }

    /// Keeps the last good snapshot and remembers the error for display.
    pub fn record_error(&mut self, error: &DeployLensError) {
        self.last_error = Some(error.to_string());
    }

    pub fn snapshot(&self) -> Option<&RunSnapshot> {
        self.latest.as_ref().map(|polled| &polled.snapshot)
    }

    pub fn sequence(&self) -> u64 {
        self.latest.as_ref().map_or(0, |polled| polled.sequence)
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    pub fn deployment_urls(&self) -> &DeploymentUrls {
        &self.urls
    }

    pub fn deployment_url(&self) -> Option<&str> {
        self.urls.preferred()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True once the workflow has reached a terminal status.
    pub fn completed(&self) -> bool {
        self.snapshot().is_some_and(RunSnapshot::is_terminal)
    }
}
