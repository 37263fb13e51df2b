use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Method;

use crate::errors::{body_text, Error, Result};
use crate::job::{Job, JobRequest, JobTarget};
use crate::poller::StatusSource;
use crate::session::{bearer_headers, Session};
use crate::transport::{FilePart, Payload, Response, Transport};

pub const CREATE_PATH: &str = "/api/create";

pub fn job_path(job_id: u64) -> String {
    format!("/api/job/{job_id}")
}

/// Submits jobs and fetches their status. Cheap to clone; clones share the
/// session.
#[derive(Debug, Clone)]
pub struct JobClient {
    transport: Transport,
    session: Session,
}

impl JobClient {
    pub fn new(transport: Transport, session: Session) -> JobClient {
        JobClient { transport, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Logs in eagerly instead of on the first request.
    pub async fn initialize(&self) -> Result<()> {
        self.session.login().await?;
        Ok(())
    }

    pub async fn submit(&self, request: &JobRequest) -> Result<Job> {
        debug!(
            "submitting {} job for {}",
            request.mode().as_str(),
            request.display_name()
        );
        let payload = create_payload(request);
        let response = self
            .send_authorized(Method::POST, CREATE_PATH, &payload)
            .await?;
        if !response.is_accepted() {
            return Err(Error::Submit {
                status: response.status,
                body: body_text(&response.body),
            });
        }
        let job: Job = serde_json::from_slice(&response.body)?;
        debug!("job {} created with status {}", job.id, job.status);
        Ok(job)
    }

    pub async fn status(&self, job_id: u64) -> Result<Job> {
        let response = self
            .send_authorized(Method::GET, &job_path(job_id), &Payload::Empty)
            .await?;
        if !response.is_accepted() {
            return Err(Error::Query {
                status: response.status,
                body: body_text(&response.body),
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    // A 401 gets exactly one re-login and one resend; whatever comes back
    // the second time is final.
    async fn send_authorized(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
    ) -> Result<Response> {
        let token = self.session.token().await?;
        let response = self
            .transport
            .send(method.clone(), path, bearer_headers(&token)?, payload)
            .await?;
        if response.status != 401 {
            return Ok(response);
        }

        warn!("{method} {path} rejected the bearer token");
        let token = self.session.refresh(&token).await?;
        Ok(self
            .transport
            .send(method, path, bearer_headers(&token)?, payload)
            .await?)
    }
}

/// Uploads go out as multipart form data, server-side paths as JSON.
pub fn create_payload(request: &JobRequest) -> Payload {
    let mode = request.mode().as_str();
    match request.target() {
        JobTarget::LocalFile { bytes, name } => Payload::Multipart {
            fields: vec![("type".to_string(), mode.to_string())],
            file: Some(FilePart {
                field: "file".to_string(),
                file_name: name.clone(),
                bytes: bytes.clone(),
            }),
        },
        JobTarget::RemoteRef { path } => Payload::Json(serde_json::json!({
            "filename": path,
            "type": mode,
        })),
    }
}

#[async_trait]
impl StatusSource for JobClient {
    async fn fetch_status(&self, job_id: u64) -> Result<Job> {
        self.status(job_id).await
    }
}
