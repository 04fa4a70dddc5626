// Application Layer - Job state store operations

pub mod consistency;
pub mod constants;
pub mod job_state;
pub mod scan;

// Re-exports
pub use consistency::{ConsistencyReport, ConsistencyViolation};
pub use job_state::JobStateStore;
pub use scan::{ScanControl, ScanOutcome};
