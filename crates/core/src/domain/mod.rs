// Domain Layer - Job entities and the key codec

pub mod error;
pub mod job;
pub mod keys;

// Re-exports
pub use error::DomainError;
pub use job::{JobKey, JobPayload, JobRecord, JobState, JobType, Retries};
