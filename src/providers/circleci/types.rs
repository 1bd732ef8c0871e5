use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::snapshot::{Workflow, WorkflowStatus};

/// A page of a v2 list endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Workflow as returned by `v2/pipeline/{id}/workflow` and `v2/workflow/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiWorkflow {
    pub id: String,
    pub name: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pipeline_number: Option<u64>,
}

impl From<ApiWorkflow> for Workflow {
    fn from(workflow: ApiWorkflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.name,
            status: workflow.status,
            created_at: workflow.created_at,
            stopped_at: workflow.stopped_at,
        }
    }
}

/// Body of the v1.1 `project/{slug}/{job_number}` endpoint; only the steps matter here.
#[derive(Debug, Deserialize)]
pub struct LegacyJobDetail {
    #[serde(default)]
    pub steps: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub actions: Vec<LegacyAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyAction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub output_url: Option<String>,
}

/// One entry of an `output_url` document.
#[derive(Debug, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub message: String,
}
