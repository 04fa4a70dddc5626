// Job Domain Model

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Job key (externally generated, globally unique, monotonically increasing)
pub type JobKey = u64;

/// Retry counter carried by a job record
pub type Retries = i32;

/// Lifecycle state of a job
///
/// Exactly one state exists per stored job. The state decides which
/// secondary index (if any) holds an entry for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Eligible for a worker to claim; indexed by type
    Activatable,
    /// Claimed by a worker; indexed by deadline
    Activated,
    /// Out of retries; not indexed
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 3] = [JobState::Activatable, JobState::Activated, JobState::Failed];

    /// One-byte storage code
    pub fn code(self) -> u8 {
        match self {
            JobState::Activatable => 0,
            JobState::Activated => 1,
            JobState::Failed => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(JobState::Activatable),
            1 => Ok(JobState::Activated),
            2 => Ok(JobState::Failed),
            other => Err(DomainError::UnknownStateCode(other)),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Activatable => write!(f, "ACTIVATABLE"),
            JobState::Activated => write!(f, "ACTIVATED"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Job Type (worker-facing name, e.g. "payment-service")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job Payload (opaque JSON, passed through unchanged)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Job record as stored in the primary key space
///
/// The store only inspects `job_type`, `deadline` and `retries`;
/// `worker` and `payload` are carried for the surrounding system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_type: JobType,

    /// Absolute expiry timestamp (epoch ms); 0 until the job is activated
    #[serde(default)]
    pub deadline: i64,

    #[serde(default)]
    pub retries: Retries,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,

    #[serde(default)]
    pub payload: JobPayload,
}

impl JobRecord {
    /// Create a record with no deadline and no worker
    pub fn new(job_type: JobType, retries: Retries, payload: JobPayload) -> Self {
        Self {
            job_type,
            deadline: 0,
            retries,
            worker: None,
            payload,
        }
    }

    /// Copy of this record as handed to a worker
    pub fn activated_by(&self, worker: impl Into<String>, deadline: i64) -> Self {
        Self {
            deadline,
            worker: Some(worker.into()),
            ..self.clone()
        }
    }

    /// State a failed job moves to: back to the pool while retries remain
    pub fn state_after_failure(&self) -> JobState {
        if self.retries > 0 {
            JobState::Activatable
        } else {
            JobState::Failed
        }
    }
}
