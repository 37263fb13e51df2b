use std::fmt;
use std::io;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStatus")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    // Completed and Failed share a rank: neither may follow the other.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether `next` is a legal observation after `self` for the same job.
    pub fn may_advance_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return next == self;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// The service reports the status by name; older builds sent the numeric
/// enum value instead.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Name(String),
    Code(i64),
}

impl TryFrom<RawStatus> for JobStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw {
            RawStatus::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "pending" => Ok(JobStatus::Pending),
                "running" => Ok(JobStatus::Running),
                "completed" => Ok(JobStatus::Completed),
                "failed" => Ok(JobStatus::Failed),
                _ => Err(format!("unknown job status {name:?}")),
            },
            RawStatus::Code(1) => Ok(JobStatus::Pending),
            RawStatus::Code(2) => Ok(JobStatus::Running),
            RawStatus::Code(3) => Ok(JobStatus::Completed),
            RawStatus::Code(4) => Ok(JobStatus::Failed),
            RawStatus::Code(code) => Err(format!("unknown job status code {code}")),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A job as reported by `/api/create` and `/api/job/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filename: String,
    pub status: JobStatus,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub r#type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub started_at: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub completed_at: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub output: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub updated_at: String,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobMode {
    Identify,
    Validate,
}

impl JobMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JobMode::Identify => "Identify",
            JobMode::Validate => "Validate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobTarget {
    /// Uploaded as multipart form data.
    LocalFile { bytes: Bytes, name: String },
    /// A path the service can already see on its side.
    RemoteRef { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    target: JobTarget,
    mode: JobMode,
}

impl JobRequest {
    pub fn upload(name: impl Into<String>, bytes: impl Into<Bytes>, mode: JobMode) -> JobRequest {
        JobRequest {
            target: JobTarget::LocalFile {
                bytes: bytes.into(),
                name: name.into(),
            },
            mode,
        }
    }

    pub fn remote(path: impl Into<String>, mode: JobMode) -> JobRequest {
        JobRequest {
            target: JobTarget::RemoteRef { path: path.into() },
            mode,
        }
    }

    /// Reads the whole file into memory for upload.
    pub fn from_file(path: impl AsRef<Path>, mode: JobMode) -> io::Result<JobRequest> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(JobRequest::upload(upload_name(path), bytes, mode))
    }

    pub fn target(&self) -> &JobTarget {
        &self.target
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    /// The file name the service will record for this job.
    pub fn display_name(&self) -> &str {
        match &self.target {
            JobTarget::LocalFile { name, .. } => name,
            JobTarget::RemoteRef { path } => path,
        }
    }
}

pub(crate) fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
