use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{DeployLensError, Result};
use crate::poller::SnapshotSource;
use crate::snapshot::{PipelineId, RunSnapshot, StatusResponse};

/// Reads snapshots from a running `/status` endpoint instead of CircleCI.
pub struct StatusApiClient {
    client: Client,
    status_url: Url,
}

impl StatusApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let status_url = Url::parse(&normalized)
            .and_then(|base| base.join("status"))
            .map_err(|e| DeployLensError::Config(format!("Invalid status server URL: {e}")))?;

        Ok(Self { client, status_url })
    }
}

#[async_trait]
impl SnapshotSource for StatusApiClient {
    async fn fetch_snapshot(&self, pipeline_id: &PipelineId) -> Result<RunSnapshot> {
        let mut url = self.status_url.clone();
        url.query_pairs_mut()
            .append_pair("pipelineId", pipeline_id.as_str());

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployLensError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let payload: StatusResponse = serde_json::from_str(&body)
            .map_err(|e| DeployLensError::MalformedResponse(format!("{url}: {e}")))?;

        payload.into_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> StatusApiClient {
        StatusApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_reads_success_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/status")
            .match_query(Matcher::UrlEncoded("pipelineId".into(), "p1".into()))
            .with_body(
                r#"{"success": true, "pipelineId": "p1", "workflowId": "wf-1",
                    "workflow": {"id": "wf-1", "name": "deploy", "status": "success", "created_at": "2024-05-01T10:00:00Z", "stopped_at": "2024-05-01T10:02:00Z"},
                    "jobs": [{"id": "j1", "name": "deploy", "status": "success", "job_number": 3, "steps": [], "fullLogs": "done\n", "stepDetails": [], "fetchStatus": "success"}]}"#,
            )
            .create_async()
            .await;

        let snapshot = client_for(&server)
            .fetch_snapshot(&PipelineId::from("p1"))
            .await
            .unwrap();

        assert!(snapshot.is_terminal());
        assert_eq!(snapshot.jobs[0].full_log, "done\n");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_maps_failure_payloads() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/status")
            .match_query(Matcher::Any)
            .with_body(r#"{"success": false, "error": "No jobs found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .fetch_snapshot(&PipelineId::from("p1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(StatusApiClient::new("::nope", Duration::from_secs(1)).is_err());
    }
}
