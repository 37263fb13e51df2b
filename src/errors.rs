use std::time::Duration;

use thiserror::Error;

use crate::job::JobStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single HTTP exchange, before any status code is looked at.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot resolve {path} against the base url: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

impl TransportError {
    /// Connection failures and timeouts are expected to go away on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Timeout { .. }
        )
    }
}

/// A result document the decoders could not salvage.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("result document is empty")]
    Empty,

    #[error("malformed result document: {0}")]
    Xml(String),

    #[error("result document lacks the <{0}> element")]
    MissingElement(&'static str),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IngestList login responded with status {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("token cannot be sent as an Authorization header")]
    InvalidToken,

    #[error("IngestList refused the job with status {status}: {body}")]
    Submit { status: u16, body: String },

    #[error("IngestList job query responded with status {status}: {body}")]
    Query { status: u16, body: String },

    #[error("IL wrapper refused the upload with status {status}: {body}")]
    Upload { status: u16, body: String },

    #[error("IL wrapper identification responded with status {status}: {body}")]
    Identify { status: u16, body: String },

    #[error("IngestList sent an undecodable job document: {0}")]
    JobDecode(#[from] serde_json::Error),

    #[error("IngestList failed to execute job {job_id}, error msg is: {error}")]
    JobFailed { job_id: u64, error: String },

    #[error("job {job_id} did not complete within {waited:?}")]
    Timeout { job_id: u64, waited: Duration },

    #[error("waiting for job {job_id} was cancelled")]
    Cancelled { job_id: u64 },

    #[error("job {job_id} went from {from:?} back to {to:?}")]
    StatusRegression {
        job_id: u64,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl Error {
    /// True for the two terminal outcomes of a wait that the service knows
    /// nothing about.
    pub fn is_local_abort(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Cancelled { .. })
    }
}

pub(crate) fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}
