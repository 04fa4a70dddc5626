// Store constants (no magic values)

/// Entries fetched per substrate read while scanning an index (256)
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 256;

/// Extra record reads when an index entry seems to point at a missing job (2)
pub const INDEX_RECHECK_ATTEMPTS: usize = 2;

/// Index names used in corruption reports
pub const ACTIVATABLE_INDEX: &str = "activatable";
pub const DEADLINE_INDEX: &str = "deadline";
pub const STATE_INDEX: &str = "job_states";
