//! Cache configuration.
//!
//! Each cache instance is configured independently, so several caches with
//! different base URLs can coexist in one process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a zero-subscriber entry keeps its data before eviction.
/// 60 seconds is enough to survive rapid remounts (e.g. navigation)
/// without holding abandoned data indefinitely.
const DEFAULT_KEEP_UNUSED_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base URL that request paths are resolved against.
    pub base_url: String,
    /// Grace delay between the last unsubscribe and eviction.
    pub keep_unused_for: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            keep_unused_for: Duration::from_secs(DEFAULT_KEEP_UNUSED_SECS),
        }
    }
}

impl CacheConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn keep_unused_for(mut self, grace: Duration) -> Self {
        self.keep_unused_for = grace;
        self
    }
}
