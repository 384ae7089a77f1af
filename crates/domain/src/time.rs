//! Wall-clock timestamps for effect events and rule health records.
//!
//! Effect timing (pulse durations, retry backoff) uses the async runtime's
//! monotonic clock instead; these timestamps are for display only.

use chrono::{DateTime, Utc};

/// UTC timestamp attached to effect events and rule status changes.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
