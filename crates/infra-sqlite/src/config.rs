// SQLite Store Configuration

use jobstate_core::error::{AppError, Result};
use std::time::Duration;

/// Database URL (`sqlite::memory:`, `sqlite:///var/lib/jobs.db`, or a plain path)
pub const ENV_DB_URL: &str = "JOBSTATE_DB_URL";

/// Maximum pooled connections
pub const ENV_DB_MAX_CONNECTIONS: &str = "JOBSTATE_DB_MAX_CONNECTIONS";

/// Busy timeout in milliseconds
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "JOBSTATE_DB_BUSY_TIMEOUT_MS";

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the SQLite substrate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl SqliteConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `JOBSTATE_DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_DB_URL) {
            config.database_url = url;
        }

        if let Some(raw) = lookup(ENV_DB_MAX_CONNECTIONS) {
            config.max_connections = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        ENV_DB_MAX_CONNECTIONS, raw
                    )))
                }
            };
        }

        if let Some(raw) = lookup(ENV_DB_BUSY_TIMEOUT_MS) {
            let millis = raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    ENV_DB_BUSY_TIMEOUT_MS, raw
                ))
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Each in-memory SQLite connection is its own database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
