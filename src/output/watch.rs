use std::collections::HashMap;

use crate::logs::project_log_lines;
use crate::session::DeploySession;
use crate::snapshot::{Job, WorkflowStatus};

use super::progress::WaitingSpinner;
use super::styling::{bright, bright_green, bright_red, cyan, dim, status};
use super::tables::jobs_table;

/// Terminal rendering of a [`DeploySession`].
///
/// The terminal is append-only, so the renderer remembers how many log lines
/// it already printed for each job and what status and URL it last announced.
pub struct WatchRenderer {
    spinner: Option<WaitingSpinner>,
    printed_lines: HashMap<String, usize>,
    job_states: Vec<(String, String)>,
    announced_status: Option<WorkflowStatus>,
    announced_url: Option<String>,
}

impl Default for WatchRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRenderer {
    pub fn new() -> Self {
        Self {
            spinner: None,
            printed_lines: HashMap::new(),
            job_states: Vec::new(),
            announced_status: None,
            announced_url: None,
        }
    }

    pub fn waiting(&mut self, pipeline_id: &str) {
        if self.spinner.is_none() && self.announced_status.is_none() {
            self.spinner = Some(WaitingSpinner::start(&format!(
                "Waiting for workflow of pipeline {pipeline_id}"
            )));
        }
    }

    pub fn render(&mut self, session: &DeploySession) {
        let Some(snapshot) = session.snapshot() else {
            if let (Some(spinner), Some(error)) = (&self.spinner, session.last_error()) {
                spinner.set_message(error);
            }
            return;
        };

        if let Some(spinner) = self.spinner.take() {
            spinner.finish("Workflow found");
        }

        if self.announced_status.as_ref() != Some(&snapshot.workflow.status) {
            eprintln!(
                "\n{} {} {}",
                bright("Workflow"),
                cyan(&snapshot.workflow.name),
                status(snapshot.workflow.status.as_str())
            );
            self.announced_status = Some(snapshot.workflow.status.clone());
        }

        let job_states: Vec<(String, String)> = snapshot
            .jobs
            .iter()
            .map(|job| (job.name.clone(), job.status.as_str().to_string()))
            .collect();
        if job_states != self.job_states {
            eprintln!("{}", jobs_table(&snapshot.jobs));
            self.job_states = job_states;
        }

        for line in self.unprinted(&snapshot.jobs) {
            println!("{line}");
        }

        if let Some(url) = session.deployment_url() {
            if self.announced_url.as_deref() != Some(url) {
                eprintln!("\n{} {}", bright("🌐 Deployed to"), cyan(url).underlined());
                self.announced_url = Some(url.to_string());
            }
        }
    }

    pub fn finish(&mut self, session: &DeploySession) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }

        match session.snapshot().map(|snapshot| &snapshot.workflow.status) {
            Some(WorkflowStatus::Success) => {
                eprintln!("\n{}", bright_green("🎉 Deployment completed successfully!"));
            }
            Some(other) if other.is_terminal() => {
                eprintln!(
                    "\n{} {}",
                    bright_red("✗ Deployment ended with status"),
                    status(other.as_str())
                );
            }
            _ => eprintln!("\n{}", dim("Stopped watching before the workflow finished.")),
        }
    }

    /// Log lines not printed yet, job by job in workflow order.
    ///
    /// A job whose log got shorter was rebuilt from scratch and is replayed in
    /// full.
    fn unprinted(&mut self, jobs: &[Job]) -> Vec<String> {
        let mut fresh = Vec::new();

        for (index, job) in jobs.iter().enumerate() {
            let key = job
                .id
                .clone()
                .unwrap_or_else(|| format!("{index}:{}", job.name));
            let lines = project_log_lines(std::slice::from_ref(job));
            let printed = self.printed_lines.entry(key).or_default();

            if lines.len() < *printed {
                eprintln!("{}", dim(format!("--- {} log restarted ---", job.name)));
                *printed = 0;
            }
            fresh.extend_from_slice(&lines[*printed..]);
            *printed = lines.len();
        }

        fresh
    }
}
