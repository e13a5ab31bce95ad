//! Time helpers and timing constants.

use chrono::{DateTime, Duration, Utc};

/// Timing constants shared by the cache and the source layer.
pub mod constants {
    use super::Duration;

    /// How long a persisted snapshot is served without refreshing (60 seconds).
    pub fn freshness_window() -> Duration {
        Duration::seconds(60)
    }

    /// Upper bound on a single source fetch (10 seconds).
    pub fn source_fetch_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check whether `timestamp` is within `window` of the current time.
pub fn is_within(timestamp: Timestamp, window: Duration) -> bool {
    now().signed_duration_since(timestamp) < window
}
