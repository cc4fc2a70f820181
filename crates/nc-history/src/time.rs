//! Monotonic command timestamps and the merge-window check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Process-wide origin for `Timestamp::now`.
static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Milliseconds on a monotonic clock. Only differences are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(EPOCH.elapsed().as_millis() as u64)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    pub fn advanced_by(self, by: Duration) -> Self {
        Self(self.0.saturating_add(by.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Whether `later` arrived within `window` of `earlier`.
pub fn within_window(earlier: Timestamp, later: Timestamp, window: Duration) -> bool {
    later.saturating_since(earlier) <= window
}
