//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ingestlist_client::{
    ClientConfig, Credentials, JobClient, LoginField, PollConfig, RetryConfig, Session, Transport,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const USERNAME: &str = "archivist";
pub const PASSWORD: &str = "secret";

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 5,
        backoff_factor_secs: 0.0,
        status_forcelist: vec![502, 503, 504],
        timeout_secs: 5.0,
    }
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval_secs: 0.01,
        max_wait_secs: 5.0,
    }
}

pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        retry: fast_retry(),
        poll: fast_poll(),
        ..ClientConfig::new(base_url, USERNAME, PASSWORD)
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        login_field: LoginField::Email,
    }
}

pub fn job_client(base_url: &str) -> JobClient {
    let transport = Transport::new(base_url, fast_retry()).unwrap();
    let session = Session::new(transport.clone(), credentials());
    JobClient::new(transport, session)
}

/// A client whose cached token the server no longer accepts.
pub fn job_client_with_token(base_url: &str, token: &str) -> JobClient {
    let transport = Transport::new(base_url, fast_retry()).unwrap();
    let session = Session::with_token(transport.clone(), credentials(), token.to_string());
    JobClient::new(transport, session)
}

pub fn login_body(token: &str) -> String {
    serde_json::json!({ "token": token }).to_string()
}

pub fn job_json(id: u64, status: &str, output: &str) -> String {
    serde_json::json!({
        "id": id,
        "filename": "a.pdf",
        "status": status,
        "type": "Identify",
        "started_at": "2025-06-02T10:14:00Z",
        "completed_at": null,
        "output": output,
        "error": "",
        "created_at": "2025-06-02T10:13:58Z",
        "updated_at": "2025-06-02T10:14:00Z"
    })
    .to_string()
}

/// Answers each connection with the next scripted `(status, body)` pair and
/// repeats the last one once the script runs out. Counts connections, which
/// equals requests because every response closes the connection.
pub struct ScriptedServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl ScriptedServer {
    pub async fn start(script: Vec<(u16, &'static str)>) -> ScriptedServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script.get(n).or(script.last()).copied().unwrap();
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        ScriptedServer { url, hits }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Accepts connections and never answers.
pub struct SilentServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl SilentServer {
    pub async fn start() -> SilentServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        SilentServer { url, hits }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + length {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            return;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
