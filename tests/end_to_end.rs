use std::sync::{Arc, Mutex};
use std::time::Duration;

use deploylens::logs::{extract_deployment_url, project_log_lines};
use deploylens::poller::{PollOutcome, PolledSnapshot, SnapshotSource, StatusPoller};
use deploylens::providers::circleci::{CircleCiClient, CircleCiProvider, ClientOptions};
use deploylens::server::{router, StatusApiClient, StatusState};
use deploylens::session::DeploySession;
use deploylens::snapshot::{FetchStatus, PipelineId};
use tokio::net::TcpListener;
use tokio_test::assert_ok;

async fn mock_successful_deploy(server: &mut mockito::Server) -> Vec<mockito::Mock> {
    let url = server.url();
    vec![
        server
            .mock("GET", "/api/v2/pipeline/p1/workflow")
            .with_body(
                r#"{"items": [{"id": "wf-1", "name": "build-and-deploy", "status": "success",
                    "created_at": "2024-05-01T10:00:00Z", "stopped_at": "2024-05-01T10:03:00Z"}],
                    "next_page_token": null}"#,
            )
            .create_async()
            .await,
        server
            .mock("GET", "/api/v2/workflow/wf-1/job")
            .with_body(
                r#"{"items": [{"id": "job-1", "name": "deploy", "status": "success",
                    "job_number": 42, "type": "build"}], "next_page_token": null}"#,
            )
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1.1/project/gh/org/site/42")
            .with_body(format!(
                r#"{{"steps": [{{"name": "Deploy", "actions": [{{"name": "Deploy", "status": "success",
                    "type": "test", "output_url": "{url}/output/42"}}]}}]}}"#
            ))
            .create_async()
            .await,
        server
            .mock("GET", "/output/42")
            .with_body(
                r#"[{"message": "Unique deploy URL: https://site-42.example\n", "time": "2024-05-01T10:02:00Z", "type": "out"}]"#,
            )
            .create_async()
            .await,
    ]
}

fn circleci_provider(server: &mockito::Server) -> CircleCiProvider {
    let client = assert_ok!(CircleCiClient::new(
        &server.url(),
        Some("test-token".into()),
        ClientOptions::default(),
    ));
    CircleCiProvider::new(client, vec!["gh/org/site".to_string()])
}

async fn poll_to_completion(source: Arc<dyn SnapshotSource>) -> (PollOutcome, DeploySession) {
    let delivered: Arc<Mutex<Vec<PolledSnapshot>>> = Arc::default();
    let sink = Arc::clone(&delivered);

    let handle = StatusPoller::new(source, Duration::from_millis(50)).start(
        PipelineId::from("p1"),
        move |polled| sink.lock().unwrap().push(polled),
        |error| panic!("unexpected poll error: {error}"),
    );
    let outcome = tokio::time::timeout(Duration::from_secs(10), handle.finished())
        .await
        .expect("poller should finish on a terminal workflow");

    let mut session = DeploySession::new();
    for polled in delivered.lock().unwrap().drain(..) {
        session.apply(polled);
    }
    (outcome, session)
}

#[tokio::test]
async fn test_successful_deploy_reports_unique_url() {
    let mut server = mockito::Server::new_async().await;
    let mocks = mock_successful_deploy(&mut server).await;

    let (outcome, session) = poll_to_completion(Arc::new(circleci_provider(&server))).await;

    assert_eq!(outcome, PollOutcome::Completed { polls: 1 });
    assert!(session.completed());

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.jobs.len(), 1);
    assert_eq!(snapshot.jobs[0].fetch_status, FetchStatus::Success);

    let lines = project_log_lines(&snapshot.jobs);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("https://site-42.example"));
    assert_eq!(
        extract_deployment_url(&lines).as_deref(),
        Some("https://site-42.example")
    );
    assert_eq!(session.deployment_url(), Some("https://site-42.example"));

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_watching_through_status_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_successful_deploy(&mut server).await;

    let provider: Arc<dyn SnapshotSource> = Arc::new(circleci_provider(&server));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let endpoint = tokio::spawn(async move {
        axum::serve(listener, router(StatusState::new(Some(provider))))
            .await
            .unwrap();
    });

    let remote = assert_ok!(StatusApiClient::new(
        &format!("http://{address}"),
        Duration::from_secs(5),
    ));
    let (outcome, session) = poll_to_completion(Arc::new(remote)).await;

    assert_eq!(outcome, PollOutcome::Completed { polls: 1 });
    assert!(session.completed());
    assert_eq!(session.deployment_url(), Some("https://site-42.example"));
    assert_eq!(session.snapshot().unwrap().jobs[0].name, "deploy");

    endpoint.abort();
}
