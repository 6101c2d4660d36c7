use crate::error::{Result, WeirError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Paging, caching, and polling knobs for the commit-stream adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Maximum number of cached checkpoint→transaction entries.
    ///
    /// Zero disables the cache entirely (every read goes to the
    /// single-flight loader).
    pub cache_size: usize,

    /// Minimum wall time between re-polls of the same tail checkpoint.
    pub poll_interval_ms: u64,

    /// Maximum transactions per page; a full page triggers a preload of
    /// the next one.
    pub max_page_size: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            cache_size: 10_000,
            poll_interval_ms: 500,
            max_page_size: 100,
        }
    }
}

impl AdapterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(WeirError::Config(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
