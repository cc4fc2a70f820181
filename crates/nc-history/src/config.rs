//! History engine configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default undo depth.
pub const DEFAULT_MAX_HISTORY_SIZE: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default merge window for gesture bursts, in milliseconds.
pub const DEFAULT_MERGE_WINDOW_MS: u64 = 500;

/// Configuration for `HistoryEngine`.
///
/// Every field has a default, so a partial JSON object such as
/// `{ "max_history_size": 20 }` deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries. Oldest entries are evicted beyond
    /// this. Default: **50**.
    pub max_history_size: NonZeroUsize,

    /// Consecutive mergeable commands on the same target that arrive within
    /// this many milliseconds collapse into one entry. Default: **500**.
    pub merge_window_ms: u64,
}

impl HistoryConfig {
    pub fn merge_window(&self) -> Duration {
        Duration::from_millis(self.merge_window_ms)
    }

    pub fn with_max_history_size(mut self, max: NonZeroUsize) -> Self {
        self.max_history_size = max;
        self
    }

    pub fn with_merge_window(mut self, window: Duration) -> Self {
        self.merge_window_ms = window.as_millis() as u64;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            merge_window_ms: DEFAULT_MERGE_WINDOW_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_history_size.get(), 50);
        assert_eq!(config.merge_window(), Duration::from_millis(500));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: HistoryConfig = serde_json::from_str(r#"{ "max_history_size": 20 }"#).unwrap();
        assert_eq!(config.max_history_size.get(), 20);
        assert_eq!(config.merge_window_ms, DEFAULT_MERGE_WINDOW_MS);
    }

    #[test]
    fn zero_history_size_is_rejected() {
        let parsed = serde_json::from_str::<HistoryConfig>(r#"{ "max_history_size": 0 }"#);
        assert!(parsed.is_err());
    }
}
