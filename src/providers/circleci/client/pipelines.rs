use log::debug;

use super::core::CircleCiClient;
use crate::error::Result;
use crate::providers::circleci::types::{ApiWorkflow, Page};
use crate::snapshot::{Job, PipelineId};

impl CircleCiClient {
    /// Workflows of a pipeline, first page only.
    pub async fn list_workflows(&self, pipeline_id: &PipelineId) -> Result<Vec<ApiWorkflow>> {
        let url = self.endpoint(["v2", "pipeline", pipeline_id.as_str(), "workflow"])?;
        let page: Page<ApiWorkflow> = self.get_json(url).await?;
        Ok(page.items)
    }

    pub async fn fetch_workflow(&self, workflow_id: &str) -> Result<ApiWorkflow> {
        let url = self.endpoint(["v2", "workflow", workflow_id])?;
        self.get_json(url).await
    }

    /// All jobs of a workflow, following `next_page_token` across pages.
    pub async fn list_jobs(&self, workflow_id: &str) -> Result<Vec<Job>> {
        let mut all_jobs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = self.endpoint(["v2", "workflow", workflow_id, "job"])?;
            if let Some(token) = &cursor {
                url.query_pairs_mut().append_pair("page-token", token);
            }

            let page: Page<Job> = self.get_json(url).await?;
            all_jobs.extend(page.items);

            match page.next_page_token {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    debug!("Workflow {workflow_id}: fetching next page of jobs");
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        Ok(all_jobs)
    }
}
