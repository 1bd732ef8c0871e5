//! Run state reconstructed from CircleCI, and the `/status` JSON contract.
//!
//! A [`RunSnapshot`] is built fresh on every poll and never mutated afterwards;
//! the next snapshot replaces it wholesale.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeployLensError, Result};

pub const NO_WORKFLOW_FOUND: &str = "No workflow found";
pub const NO_JOBS_FOUND: &str = "No jobs found";
pub const MISSING_PARAMETERS: &str = "Missing pipelineId or CIRCLECI_TOKEN";

/// Placeholder output for a running action whose log is not published yet.
pub const STEP_STILL_RUNNING: &str = "[Step still running...]";

/// Opaque pipeline handle produced by whoever triggered the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(String);

impl PipelineId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PipelineId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PipelineId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workflow status as reported by the v2 API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowStatus {
    Running,
    Success,
    Failed,
    Canceled,
    Error,
    Failing,
    OnHold,
    NotRun,
    Queued,
    Other(String),
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Error => "error",
            Self::Failing => "failing",
            Self::OnHold => "on_hold",
            Self::NotRun => "not_run",
            Self::Queued => "queued",
            Self::Other(status) => status,
        }
    }

    /// No further progress happens after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Canceled | Self::Error
        )
    }
}

impl From<String> for WorkflowStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "error" => Self::Error,
            "failing" => Self::Failing,
            "on_hold" => Self::OnHold,
            "not_run" => Self::NotRun,
            "queued" => Self::Queued,
            _ => Self::Other(value),
        }
    }
}

impl From<WorkflowStatus> for String {
    fn from(value: WorkflowStatus) -> Self {
        match value {
            WorkflowStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the v2 API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Success,
    Running,
    NotRun,
    Failed,
    Retried,
    Queued,
    NotRunning,
    InfrastructureFail,
    Timedout,
    OnHold,
    Blocked,
    Canceled,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Running => "running",
            Self::NotRun => "not_run",
            Self::Failed => "failed",
            Self::Retried => "retried",
            Self::Queued => "queued",
            Self::NotRunning => "not_running",
            Self::InfrastructureFail => "infrastructure_fail",
            Self::Timedout => "timedout",
            Self::OnHold => "on_hold",
            Self::Blocked => "blocked",
            Self::Canceled => "canceled",
            Self::Other(status) => status,
        }
    }

    /// Jobs that have not started have no logs to fetch.
    pub fn is_not_started(&self) -> bool {
        matches!(self, Self::NotRun | Self::Queued)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => Self::Success,
            "running" => Self::Running,
            "not_run" => Self::NotRun,
            "failed" => Self::Failed,
            "retried" => Self::Retried,
            "queued" => Self::Queued,
            "not_running" => Self::NotRunning,
            "infrastructure_fail" => Self::InfrastructureFail,
            "timedout" => Self::Timedout,
            "on_hold" => Self::OnHold,
            "blocked" => Self::Blocked,
            "canceled" => Self::Canceled,
            _ => Self::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the log/step enrichment of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Pending,
    NotStarted,
    Success,
    Failed,
}

/// The workflow associated with a pipeline. Only the first one listed counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub status: WorkflowStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

/// A single action within a step, with its fetched output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
}

/// An ordered step of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub actions: Vec<Action>,
    /// Concatenated output of this step's actions.
    #[serde(default)]
    pub logs: String,
}

/// A v2 job enriched with v1.1 step data and logs.
///
/// Unknown v2 fields are kept in `extra` so they survive into the `/status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub job_number: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Steps exactly as the legacy API returned them.
    #[serde(rename = "steps", default)]
    pub raw_steps: Vec<Value>,
    #[serde(rename = "fullLogs", default)]
    pub full_log: String,
    #[serde(rename = "stepDetails", default)]
    pub steps: Vec<Step>,
    #[serde(rename = "fetchStatus", default)]
    pub fetch_status: FetchStatus,
    /// Why steps and logs are missing when `fetch_status` is `failed`.
    #[serde(rename = "fetchError", default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

/// One complete, immutable reconstruction of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub pipeline_id: PipelineId,
    pub workflow_id: String,
    pub workflow: Workflow,
    pub jobs: Vec<Job>,
}

impl RunSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.workflow.status.is_terminal()
    }
}

/// Body of `GET /status?pipelineId=<id>`.
///
/// Field names are part of the contract with existing consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(rename = "pipelineId", default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<PipelineId>,
    #[serde(rename = "workflowId", default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            pipeline_id: None,
            workflow_id: None,
            workflow: None,
            jobs: None,
            error: Some(message.into()),
        }
    }

    /// Convert a received payload back into a snapshot.
    pub fn into_snapshot(self) -> Result<RunSnapshot> {
        if !self.success {
            let message = self.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(if message == NO_WORKFLOW_FOUND || message == NO_JOBS_FOUND {
                DeployLensError::NotFound(message)
            } else {
                DeployLensError::Remote(message)
            });
        }

        match (self.pipeline_id, self.workflow_id, self.workflow, self.jobs) {
            (Some(pipeline_id), Some(workflow_id), Some(workflow), Some(jobs)) => {
                Ok(RunSnapshot {
                    pipeline_id,
                    workflow_id,
                    workflow,
                    jobs,
                })
            }
            _ => Err(DeployLensError::MalformedResponse(
                "status payload is missing pipelineId, workflowId, workflow or jobs".to_string(),
            )),
        }
    }
}

impl From<RunSnapshot> for StatusResponse {
    fn from(snapshot: RunSnapshot) -> Self {
        Self {
            success: true,
            pipeline_id: Some(snapshot.pipeline_id),
            workflow_id: Some(snapshot.workflow_id),
            workflow: Some(snapshot.workflow),
            jobs: Some(snapshot.jobs),
            error: None,
        }
    }
}

impl From<&DeployLensError> for StatusResponse {
    fn from(error: &DeployLensError) -> Self {
        Self::failure(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> Job {
        Job {
            id: Some("job-1".to_string()),
            name: "deploy".to_string(),
            status: JobStatus::Success,
            job_number: Some(42),
            extra: Map::new(),
            raw_steps: vec![json!({"name": "Spin up environment", "actions": []})],
            full_log: "line one\nline two\n".to_string(),
            steps: vec![Step {
                name: "Deploy".to_string(),
                status: None,
                actions: vec![Action {
                    name: "Deploy".to_string(),
                    status: "success".to_string(),
                    kind: "test".to_string(),
                    output: "line one\nline two\n".to_string(),
                    output_url: None,
                }],
                logs: "line one\nline two\n".to_string(),
            }],
            fetch_status: FetchStatus::Success,
            fetch_error: None,
        }
    }

    fn sample_snapshot(status: &str) -> RunSnapshot {
        RunSnapshot {
            pipeline_id: PipelineId::from("p1"),
            workflow_id: "wf-1".to_string(),
            workflow: Workflow {
                id: "wf-1".to_string(),
                name: "build-and-deploy".to_string(),
                status: WorkflowStatus::from(status.to_string()),
                created_at: None,
                stopped_at: None,
            },
            jobs: vec![sample_job()],
        }
    }

    #[test]
    fn test_terminal_statuses() {
        for status in ["success", "failed", "canceled", "error"] {
            assert!(WorkflowStatus::from(status.to_string()).is_terminal(), "{status}");
        }
        for status in ["running", "on_hold", "not_run", "queued", "failing", "unauthorized"] {
            assert!(!WorkflowStatus::from(status.to_string()).is_terminal(), "{status}");
        }
    }

    #[test]
    fn test_unknown_status_round_trips_verbatim() {
        let status: WorkflowStatus = serde_json::from_value(json!("unauthorized")).unwrap();
        assert_eq!(status, WorkflowStatus::Other("unauthorized".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("unauthorized"));
    }

    #[test]
    fn test_job_not_started_statuses() {
        assert!(JobStatus::NotRun.is_not_started());
        assert!(JobStatus::Queued.is_not_started());
        assert!(!JobStatus::Running.is_not_started());
        assert!(!JobStatus::Blocked.is_not_started());
    }

    #[test]
    fn test_status_response_field_names() {
        let response = StatusResponse::from(sample_snapshot("running"));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["pipelineId"], json!("p1"));
        assert_eq!(value["workflowId"], json!("wf-1"));
        assert_eq!(value["workflow"]["status"], json!("running"));
        assert!(value["workflow"]["stopped_at"].is_null());
        assert!(value.get("error").is_none());

        let job = &value["jobs"][0];
        assert_eq!(job["job_number"], json!(42));
        assert_eq!(job["fetchStatus"], json!("success"));
        assert_eq!(job["fullLogs"], json!("line one\nline two\n"));
        assert_eq!(job["steps"][0]["name"], json!("Spin up environment"));
        assert_eq!(job["stepDetails"][0]["actions"][0]["type"], json!("test"));
        assert!(job.get("fetchError").is_none());
    }

    #[test]
    fn test_fetch_error_is_reported_for_failed_jobs() {
        let mut job = sample_job();
        job.fetch_status = FetchStatus::Failed;
        job.fetch_error = Some("No usable job data for job #42 after 2 project slug(s)".to_string());

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["fetchStatus"], json!("failed"));
        assert_eq!(
            value["fetchError"],
            json!("No usable job data for job #42 after 2 project slug(s)")
        );
        assert!(value.get("fetch_error").is_none());

        let decoded: Job = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_failure_response_shape() {
        let value = serde_json::to_value(StatusResponse::failure(NO_WORKFLOW_FOUND)).unwrap();
        assert_eq!(value, json!({"success": false, "error": "No workflow found"}));
    }

    #[test]
    fn test_extra_job_fields_are_preserved() {
        let job: Job = serde_json::from_value(json!({
            "id": "abc",
            "name": "build",
            "status": "queued",
            "job_number": 7,
            "project_slug": "gh/org/repo",
            "dependencies": []
        }))
        .unwrap();

        assert_eq!(job.fetch_status, FetchStatus::Pending);
        assert_eq!(job.extra["project_slug"], json!("gh/org/repo"));

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["project_slug"], json!("gh/org/repo"));
        assert_eq!(value["fetchStatus"], json!("pending"));
    }

    #[test]
    fn test_into_snapshot_round_trip() {
        let snapshot = sample_snapshot("success");
        let payload = serde_json::to_string(&StatusResponse::from(snapshot.clone())).unwrap();
        let parsed: StatusResponse = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.into_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn test_into_snapshot_maps_not_found() {
        let err = StatusResponse::failure(NO_JOBS_FOUND)
            .into_snapshot()
            .unwrap_err();
        assert!(err.is_not_found());

        let err = StatusResponse::failure("Network error: timed out")
            .into_snapshot()
            .unwrap_err();
        assert!(!err.is_not_found());
    }
}
