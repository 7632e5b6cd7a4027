//! Introspection cache statistics

use serde::{Deserialize, Serialize};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of uris with a cached procedure listing
    pub entries: usize,

    /// Resolutions answered from the cache
    pub hits: u64,

    /// Resolutions that had to ask the transport
    pub misses: u64,

    /// Successful introspections fetched from a transport
    pub fetches: u64,

    /// Introspections that failed and were not cached
    pub failures: u64,

    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate hit rate from hits and misses
    pub fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
    }

    /// Display statistics in a human-readable format
    pub fn display(&self) -> String {
        let mut output = String::new();
        output.push_str("Introspection cache:\n");
        output.push_str(&format!("  Entries: {}\n", self.entries));
        output.push_str(&format!("  Hits: {}\n", self.hits));
        output.push_str(&format!("  Misses: {}\n", self.misses));
        output.push_str(&format!("  Fetches: {}\n", self.fetches));
        output.push_str(&format!("  Failures: {}\n", self.failures));
        output.push_str(&format!("  Hit rate: {:.1}%\n", self.hit_rate * 100.0));
        output
    }
}
