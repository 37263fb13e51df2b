use std::path::Path;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

pub mod blocking;
pub mod client;
pub mod config;
pub mod decode;
pub mod errors;
pub mod ilwrapper;
pub mod job;
pub mod poller;
pub mod session;
pub mod transport;

pub use client::JobClient;
pub use config::{ClientConfig, LoginField, PollConfig, RetryConfig};
pub use errors::{DecodeError, Error, Result, TransportError};
pub use ilwrapper::WrapperClient;
pub use job::{Job, JobMode, JobRequest, JobStatus, JobTarget};
pub use poller::{PollState, Poller, StatusSource};
pub use session::{Credential, Credentials, Session};
pub use transport::Transport;

/// Async entry point: submits jobs, waits for them and hands back the final
/// job whose `output` the [`decode`] module understands.
#[derive(Debug, Clone)]
pub struct IngestListClient {
    jobs: JobClient,
    poll: PollConfig,
}

impl IngestListClient {
    pub fn new(config: &ClientConfig) -> Result<IngestListClient> {
        let transport = Transport::with_proxy(
            &config.base_url,
            config.retry.clone(),
            config.proxy.as_deref(),
        )?;
        let session = Session::new(
            transport.clone(),
            Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                login_field: config.login_field,
            },
        );
        Ok(IngestListClient {
            jobs: JobClient::new(transport, session),
            poll: config.poll.clone(),
        })
    }

    pub fn from_env() -> Result<IngestListClient> {
        IngestListClient::new(&ClientConfig::from_env()?)
    }

    pub fn jobs(&self) -> &JobClient {
        &self.jobs
    }

    pub fn poller(&self) -> Poller<JobClient> {
        Poller::new(self.jobs.clone(), &self.poll)
    }

    /// Logs in now rather than on the first request.
    pub async fn initialize(&self) -> Result<()> {
        self.jobs.initialize().await
    }

    /// Submits without waiting; the returned job is usually still `Pending`.
    pub async fn submit(&self, request: &JobRequest) -> Result<Job> {
        self.jobs.submit(request).await
    }

    pub async fn status(&self, job_id: u64) -> Result<Job> {
        self.jobs.status(job_id).await
    }

    pub async fn wait(&self, job: Job) -> Result<Job> {
        self.poller().wait(job).await
    }

    pub async fn wait_for(&self, job_id: u64) -> Result<Job> {
        self.poller().wait_for(job_id).await
    }

    pub async fn wait_cancellable(&self, job: Job, cancel: &CancellationToken) -> Result<Job> {
        self.poller().wait_cancellable(job, cancel).await
    }

    /// Submits and waits for a terminal state.
    pub async fn run(&self, request: &JobRequest) -> Result<Job> {
        let job = self.submit(request).await?;
        self.wait(job).await
    }

    pub async fn identify(&self, path: impl AsRef<Path>) -> Result<Job> {
        let request = read_request(path, JobMode::Identify).await?;
        self.run(&request).await
    }

    pub async fn validate(&self, path: impl AsRef<Path>) -> Result<Job> {
        let request = read_request(path, JobMode::Validate).await?;
        self.run(&request).await
    }

    pub async fn submit_many(&self, requests: &[JobRequest]) -> Vec<Result<Job>> {
        join_all(requests.iter().map(|request| self.submit(request))).await
    }

    pub async fn run_many(&self, requests: &[JobRequest]) -> Vec<Result<Job>> {
        join_all(requests.iter().map(|request| self.run(request))).await
    }

    pub async fn wait_many(&self, job_ids: &[u64]) -> Vec<Result<Job>> {
        self.poller().wait_many(job_ids).await
    }
}

/// Reads a local file into an upload request without blocking the runtime.
pub async fn read_request(path: impl AsRef<Path>, mode: JobMode) -> Result<JobRequest> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    Ok(JobRequest::upload(job::upload_name(path), bytes, mode))
}
