//! Time utilities for Custodia.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC for Custodia).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
