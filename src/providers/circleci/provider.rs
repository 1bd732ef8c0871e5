use async_trait::async_trait;
use log::{debug, info};

use super::client::CircleCiClient;
use super::job_details::resolve_job;
use crate::error::{DeployLensError, Result};
use crate::poller::SnapshotSource;
use crate::snapshot::{PipelineId, RunSnapshot, Workflow, NO_JOBS_FOUND, NO_WORKFLOW_FOUND};

/// Builds [`RunSnapshot`]s for pipelines of one CircleCI project.
///
/// Workflow and job state come from the v2 API; steps and logs come from the
/// v1.1 API, addressed by the first of `slugs` that answers with step data.
pub struct CircleCiProvider {
    pub client: CircleCiClient,
    pub slugs: Vec<String>,
}

impl CircleCiProvider {
    pub fn new(client: CircleCiClient, slugs: Vec<String>) -> Self {
        Self { client, slugs }
    }

    /// Reconstructs the full run state of a pipeline.
    ///
    /// Only the first workflow listed for the pipeline is considered. Jobs are
    /// enriched concurrently, and the result keeps the provider's job order.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::NotFound`] when the pipeline has no workflow
    /// or the workflow has no jobs yet, and transport/parse errors from the
    /// v2 calls. Per-job failures are reported through each job's fetch status.
    pub async fn build_snapshot(&self, pipeline_id: &PipelineId) -> Result<RunSnapshot> {
        let workflows = self.client.list_workflows(pipeline_id).await?;
        if workflows.len() > 1 {
            debug!(
                "Pipeline {pipeline_id} has {} workflows, using the first",
                workflows.len()
            );
        }

        let workflow: Workflow = workflows
            .into_iter()
            .next()
            .ok_or_else(|| DeployLensError::NotFound(NO_WORKFLOW_FOUND.to_string()))?
            .into();

        let jobs = self.client.list_jobs(&workflow.id).await?;
        if jobs.is_empty() {
            return Err(DeployLensError::NotFound(NO_JOBS_FOUND.to_string()));
        }

        let jobs = futures::future::join_all(
            jobs.into_iter()
                .map(|job| resolve_job(&self.client, job, &self.slugs)),
        )
        .await;

        info!(
            "Pipeline {pipeline_id}: workflow '{}' is {} ({} jobs)",
            workflow.name,
            workflow.status,
            jobs.len()
        );

        Ok(RunSnapshot {
            pipeline_id: pipeline_id.clone(),
            workflow_id: workflow.id.clone(),
            workflow,
            jobs,
        })
    }
}

#[async_trait]
impl SnapshotSource for CircleCiProvider {
    async fn fetch_snapshot(&self, pipeline_id: &PipelineId) -> Result<RunSnapshot> {
        self.build_snapshot(pipeline_id).await
    }
}
