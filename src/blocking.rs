//! Synchronous wrapper around [`crate::IngestListClient`].
//!
//! Each call runs to completion on a private current-thread runtime, so
//! polling blocks the caller for the whole poll interval. Must not be used
//! from inside an async context.

use std::path::Path;

use tokio::runtime::{Builder, Runtime};

use crate::config::ClientConfig;
use crate::errors::Result;
use crate::ilwrapper::{IdentifyResponse, UploadResponse};
use crate::job::{Job, JobMode, JobRequest};

pub struct IngestListClient {
    inner: crate::IngestListClient,
    runtime: Runtime,
}

impl IngestListClient {
    pub fn new(config: &ClientConfig) -> Result<IngestListClient> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(IngestListClient {
            inner: crate::IngestListClient::new(config)?,
            runtime,
        })
    }

    pub fn from_env() -> Result<IngestListClient> {
        IngestListClient::new(&ClientConfig::from_env()?)
    }

    pub fn initialize(&self) -> Result<()> {
        self.runtime.block_on(self.inner.initialize())
    }

    pub fn submit(&self, request: &JobRequest) -> Result<Job> {
        self.runtime.block_on(self.inner.submit(request))
    }

    pub fn status(&self, job_id: u64) -> Result<Job> {
        self.runtime.block_on(self.inner.status(job_id))
    }

    pub fn wait(&self, job: Job) -> Result<Job> {
        self.runtime.block_on(self.inner.wait(job))
    }

    pub fn wait_for(&self, job_id: u64) -> Result<Job> {
        self.runtime.block_on(self.inner.wait_for(job_id))
    }

    pub fn run(&self, request: &JobRequest) -> Result<Job> {
        self.runtime.block_on(self.inner.run(request))
    }

    pub fn identify(&self, path: impl AsRef<Path>) -> Result<Job> {
        self.run(&JobRequest::from_file(path, JobMode::Identify)?)
    }

    pub fn validate(&self, path: impl AsRef<Path>) -> Result<Job> {
        self.run(&JobRequest::from_file(path, JobMode::Validate)?)
    }
}

/// Synchronous [`crate::WrapperClient`].
pub struct WrapperClient {
    inner: crate::WrapperClient,
    runtime: Runtime,
}

impl WrapperClient {
    pub fn new(config: &ClientConfig) -> Result<WrapperClient> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(WrapperClient {
            inner: crate::WrapperClient::from_config(config)?,
            runtime,
        })
    }

    pub fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        self.runtime.block_on(self.inner.upload(name, bytes))
    }

    pub fn identify_path(&self, file_path: &str) -> Result<IdentifyResponse> {
        self.runtime.block_on(self.inner.identify_path(file_path))
    }

    pub fn identify_file(&self, path: impl AsRef<Path>) -> Result<IdentifyResponse> {
        self.runtime.block_on(self.inner.identify_file(path))
    }
}
