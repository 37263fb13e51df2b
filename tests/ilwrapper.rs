mod common;

use common::{config, fast_retry};
use ingestlist_client::{Error, Transport, WrapperClient};
use mockito::Matcher;
use serde_json::json;

const REPORT: &str =
    "0\nDroid\npronom-puid\tpronom-puid\tfmt/276\n\nFile\nfile-mime\tmime\ttext/plain\n";

fn wrapper(base_url: &str) -> WrapperClient {
    WrapperClient::new(Transport::new(base_url, fast_retry()).unwrap())
}

#[tokio::test]
async fn uploads_then_identifies_by_server_path() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/api/upload")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="notes.txt""#.to_string()),
            Matcher::Regex("hello wrapper".to_string()),
        ]))
        .with_status(200)
        .with_body(json!({"filePath": "/var/il/upload/notes.txt", "durationInMs": 3}).to_string())
        .expect(1)
        .create_async()
        .await;
    let identify = server
        .mock("POST", "/api/identify")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"filePath": "/var/il/upload/notes.txt"})))
        .with_status(200)
        .with_body(json!({"result": REPORT, "durationInMs": 840}).to_string())
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello wrapper").unwrap();

    let response = wrapper(&server.url()).identify_file(&path).await.unwrap();
    assert_eq!(response.duration_in_ms, 840);

    let report = response.report().unwrap();
    assert_eq!(report.return_code, "0");
    assert_eq!(report.tools.len(), 2);
    assert_eq!(report.tools[0].attributes.get("pronom-puid"), Some("fmt/276"));
    assert_eq!(report.tool("File").unwrap().attributes.get("mime"), Some("text/plain"));
    upload.assert_async().await;
    identify.assert_async().await;
}

#[tokio::test]
async fn identifies_a_file_already_on_the_server() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/api/upload")
        .expect(0)
        .create_async()
        .await;
    let _identify = server
        .mock("POST", "/api/identify")
        .with_status(200)
        .with_body(json!({"result": REPORT, "durationInMs": 10}).to_string())
        .create_async()
        .await;

    let response = wrapper(&server.url())
        .identify_path("/data/in/notes.txt")
        .await
        .unwrap();
    assert_eq!(response.result, REPORT);
    upload.assert_async().await;
}

#[tokio::test]
async fn rejected_upload_stops_before_identification() {
    let mut server = mockito::Server::new_async().await;
    let _upload = server
        .mock("POST", "/api/upload")
        .with_status(413)
        .with_body("file too large")
        .create_async()
        .await;
    let identify = server
        .mock("POST", "/api/identify")
        .expect(0)
        .create_async()
        .await;

    let err = wrapper(&server.url())
        .identify_bytes("big.iso", vec![0u8; 16])
        .await
        .unwrap_err();
    match err {
        Error::Upload { status, body } => {
            assert_eq!(status, 413);
            assert_eq!(body, "file too large");
        }
        other => panic!("expected upload error, got {other:?}"),
    }
    identify.assert_async().await;
}

#[tokio::test]
async fn failed_identification_keeps_the_service_message() {
    let mut server = mockito::Server::new_async().await;
    let _identify = server
        .mock("POST", "/api/identify")
        .with_status(404)
        .with_body(r#"{"message": "no such file"}"#)
        .create_async()
        .await;

    let err = wrapper(&server.url())
        .identify_path("/missing")
        .await
        .unwrap_err();
    match err {
        Error::Identify { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("no such file"));
        }
        other => panic!("expected identify error, got {other:?}"),
    }
}

#[tokio::test]
async fn built_from_client_config() {
    let mut server = mockito::Server::new_async().await;
    let _identify = server
        .mock("POST", "/api/identify")
        .with_status(200)
        .with_body(json!({"result": "0\nDroid\n"}).to_string())
        .create_async()
        .await;

    let client = WrapperClient::from_config(&config(&server.url())).unwrap();
    let response = client.identify_path("a.txt").await.unwrap();
    assert_eq!(response.duration_in_ms, 0);
    assert_eq!(response.report().unwrap().tools[0].tool_name, "Droid");
}
