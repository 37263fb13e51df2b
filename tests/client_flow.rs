mod common;

use common::{config, job_json, login_body};
use ingestlist_client::decode::report;
use ingestlist_client::{Error, IngestListClient, JobMode, JobRequest, JobStatus, PollConfig};
use mockito::Matcher;
use serde_json::json;

const REPORT: &str =
    "0\nDroid\npronom-puid\tpronom-puid\tfmt/18\n\nJhove\njhove-mime\tjhove-mime\tapplication/pdf\n";

async fn logged_in_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/login")
        .with_status(200)
        .with_body(login_body("tok-1"))
        .create_async()
        .await;
    server
}

#[tokio::test]
async fn identify_file_runs_to_completion_and_decodes() {
    let mut server = logged_in_server().await;
    let _create = server
        .mock("POST", "/api/create")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .with_status(200)
        .with_body(job_json(7, "Pending", ""))
        .create_async()
        .await;
    let _job = server
        .mock("GET", "/api/job/7")
        .with_status(200)
        .with_body(job_json(7, "Completed", REPORT))
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Speiseplan.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let client = IngestListClient::new(&config(&server.url())).unwrap();
    let job = client.identify(&path).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let decoded = report::parse(&job.output).unwrap();
    assert_eq!(decoded.tools[0].tool_name, "Droid");
    assert_eq!(decoded.tools[0].attributes.get("pronom-puid"), Some("fmt/18"));
    let jhove = decoded.tool("Jhove").unwrap();
    assert_eq!(jhove.attributes.get("jhove-mime"), Some("application/pdf"));
}

#[tokio::test]
async fn no_wait_returns_the_pending_job_for_later_polling() {
    let mut server = logged_in_server().await;
    let _create = server
        .mock("POST", "/api/create")
        .with_status(200)
        .with_body(job_json(8, "Pending", ""))
        .create_async()
        .await;
    let job_query = server
        .mock("GET", "/api/job/8")
        .with_status(200)
        .with_body(job_json(8, "Completed", REPORT))
        .expect(1)
        .create_async()
        .await;

    let client = IngestListClient::new(&config(&server.url())).unwrap();
    let pending = client
        .submit(&JobRequest::remote("/srv/in/a.pdf", JobMode::Identify))
        .await
        .unwrap();
    assert_eq!(pending.status, JobStatus::Pending);

    let done = client.wait_for(pending.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    job_query.assert_async().await;
}

#[tokio::test]
async fn service_failure_surfaces_the_job_error() {
    let mut server = logged_in_server().await;
    let _create = server
        .mock("POST", "/api/create")
        .with_status(200)
        .with_body(job_json(9, "Pending", ""))
        .create_async()
        .await;
    let _job = server
        .mock("GET", "/api/job/9")
        .with_status(200)
        .with_body(
            json!({"id": 9, "status": "Failed", "error": "droid crashed"}).to_string(),
        )
        .create_async()
        .await;

    let client = IngestListClient::new(&config(&server.url())).unwrap();
    let err = client
        .run(&JobRequest::remote("a.pdf", JobMode::Validate))
        .await
        .unwrap_err();
    match err {
        Error::JobFailed { job_id, error } => {
            assert_eq!(job_id, 9);
            assert_eq!(error, "droid crashed");
        }
        other => panic!("expected job failure, got {other:?}"),
    }
}

#[tokio::test]
async fn endless_running_job_times_out() {
    let mut server = logged_in_server().await;
    let _create = server
        .mock("POST", "/api/create")
        .with_status(200)
        .with_body(job_json(10, "Pending", ""))
        .create_async()
        .await;
    let _job = server
        .mock("GET", "/api/job/10")
        .with_status(200)
        .with_body(job_json(10, "Running", ""))
        .create_async()
        .await;

    let mut config = config(&server.url());
    config.poll = PollConfig {
        interval_secs: 0.02,
        max_wait_secs: 0.05,
    };
    let client = IngestListClient::new(&config).unwrap();
    let err = client
        .run(&JobRequest::remote("a.pdf", JobMode::Identify))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { job_id: 10, .. }), "got {err:?}");
    assert!(err.is_local_abort());
}

#[tokio::test]
async fn many_jobs_run_concurrently() {
    let mut server = logged_in_server().await;
    for id in 1..=3u64 {
        server
            .mock("POST", "/api/create")
            .match_body(Matcher::PartialJson(json!({"filename": format!("file{id}.txt")})))
            .with_status(200)
            .with_body(job_json(id, "Pending", ""))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/job/{id}").as_str())
            .with_status(200)
            .with_body(job_json(id, "Completed", REPORT))
            .create_async()
            .await;
    }

    let client = IngestListClient::new(&config(&server.url())).unwrap();
    let requests: Vec<JobRequest> = (1..=3)
        .map(|id| JobRequest::remote(format!("file{id}.txt"), JobMode::Identify))
        .collect();

    let pending = client.submit_many(&requests).await;
    let ids: Vec<u64> = pending.into_iter().map(|job| job.unwrap().id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let finished = client.wait_many(&ids).await;
    for (job, id) in finished.into_iter().zip(1..=3u64) {
        let job = job.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Completed);
    }

    let all = client.run_many(&requests).await;
    assert!(all.iter().all(|r| r.as_ref().map(|j| j.is_terminal()).unwrap_or(false)));
}

#[tokio::test]
async fn username_login_field_for_older_deployments() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("POST", "/api/login")
        .match_body(Matcher::Json(json!({"username": "archivist", "password": "secret"})))
        .with_status(200)
        .with_body(login_body("tok-1"))
        .create_async()
        .await;

    let mut config = config(&server.url());
    config.login_field = ingestlist_client::LoginField::Username;
    let client = IngestListClient::new(&config).unwrap();
    client.initialize().await.unwrap();
    login.assert_async().await;
}

#[tokio::test]
async fn missing_local_file_is_an_io_error() {
    let server = mockito::Server::new_async().await;
    let client = IngestListClient::new(&config(&server.url())).unwrap();
    let err = client.identify("/nonexistent/input.pdf").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got {err:?}");
}
