//! Drives submitted jobs to a terminal state.
//!
//! A job moves `Submitted -> Waiting -> {Completed, Failed, TimedOut}`.
//! Polling is read-only, so abandoning a wait (timeout, cancellation or just
//! dropping the future) leaves the remote job untouched.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, trace, warn};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::errors::{Error, Result};
use crate::job::{Job, JobStatus};

/// Anything that can report the current state of a job by id.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: u64) -> Result<Job>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Waiting,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollState::Submitted | PollState::Waiting)
    }
}

/// Rejects status observations that move a job backwards.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    job_id: u64,
    last: Option<JobStatus>,
}

impl StatusTracker {
    pub fn new(job_id: u64) -> StatusTracker {
        StatusTracker { job_id, last: None }
    }

    pub fn last(&self) -> Option<JobStatus> {
        self.last
    }

    pub fn observe(&mut self, status: JobStatus) -> Result<()> {
        if let Some(last) = self.last {
            if !last.may_advance_to(status) {
                warn!("job {} reported {status} after {last}", self.job_id);
                return Err(Error::StatusRegression {
                    job_id: self.job_id,
                    from: last,
                    to: status,
                });
            }
        }
        self.last = Some(status);
        Ok(())
    }
}

pub struct Poller<S> {
    source: S,
    interval: Duration,
    max_wait: Duration,
}

impl<S: StatusSource> Poller<S> {
    pub fn new(source: S, config: &PollConfig) -> Poller<S> {
        Poller {
            source,
            interval: config.interval(),
            max_wait: config.max_wait(),
        }
    }

    pub fn with_timing(source: S, interval: Duration, max_wait: Duration) -> Poller<S> {
        Poller {
            source,
            interval,
            max_wait,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Waits for a job just returned by a submission.
    pub async fn wait(&self, job: Job) -> Result<Job> {
        self.wait_cancellable(job, &CancellationToken::new()).await
    }

    /// Waits for a job known only by id, e.g. one submitted earlier without
    /// waiting.
    pub async fn wait_for(&self, job_id: u64) -> Result<Job> {
        self.drive(job_id, StatusTracker::new(job_id), &CancellationToken::new())
            .await
    }

    pub async fn wait_cancellable(&self, job: Job, cancel: &CancellationToken) -> Result<Job> {
        let mut tracker = StatusTracker::new(job.id);
        tracker.observe(job.status)?;
        match job.status {
            JobStatus::Completed => return Ok(job),
            JobStatus::Failed => return Err(job_failed(job)),
            JobStatus::Pending | JobStatus::Running => {}
        }
        self.drive(job.id, tracker, cancel).await
    }

    /// Polls all jobs concurrently; results come back in input order.
    pub async fn wait_many(&self, job_ids: &[u64]) -> Vec<Result<Job>> {
        join_all(job_ids.iter().map(|&job_id| self.wait_for(job_id))).await
    }

    async fn drive(
        &self,
        job_id: u64,
        mut tracker: StatusTracker,
        cancel: &CancellationToken,
    ) -> Result<Job> {
        let started = Instant::now();
        let mut state = PollState::Submitted;
        transition(job_id, &mut state, PollState::Waiting);

        loop {
            if cancel.is_cancelled() {
                debug!("job {job_id}: wait cancelled");
                return Err(Error::Cancelled { job_id });
            }

            let job = self.source.fetch_status(job_id).await?;
            tracker.observe(job.status)?;
            trace!("job {job_id}: status {}", job.status);

            match job.status {
                JobStatus::Completed => {
                    transition(job_id, &mut state, PollState::Completed);
                    return Ok(job);
                }
                JobStatus::Failed => {
                    transition(job_id, &mut state, PollState::Failed);
                    return Err(job_failed(job));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            let waited = started.elapsed();
            if waited > self.max_wait {
                transition(job_id, &mut state, PollState::TimedOut);
                return Err(Error::Timeout { job_id, waited });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("job {job_id}: wait cancelled");
                    return Err(Error::Cancelled { job_id });
                }
                _ = sleep(self.interval) => {}
            }
        }
    }
}

fn transition(job_id: u64, state: &mut PollState, next: PollState) {
    debug!("job {job_id}: {state:?} -> {next:?}");
    *state = next;
}

fn job_failed(job: Job) -> Error {
    Error::JobFailed {
        job_id: job.id,
        error: job.error,
    }
}
