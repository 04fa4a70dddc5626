// Central Error Type for the Job State Store

use thiserror::Error;

use crate::domain::JobKey;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An index entry points at a job with no primary record
    #[error("Index corruption: {index} index references job {job_key}, but no job found")]
    IndexCorruption { job_key: JobKey, index: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors the caller must not retry or recover from
    ///
    /// Index corruption and substrate failures leave the replica in a state
    /// only a replay or snapshot restore can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::IndexCorruption { .. } | AppError::Database(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
