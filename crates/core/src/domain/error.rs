// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Job type must not be empty")]
    EmptyJobType,

    #[error("Deadline must be greater than 0, got {0}")]
    NonPositiveDeadline(i64),

    #[error("Malformed {space} key: {len} bytes")]
    MalformedKey { space: &'static str, len: usize },

    #[error("Unknown job state code: {0}")]
    UnknownStateCode(u8),
}

pub type Result<T> = std::result::Result<T, DomainError>;
