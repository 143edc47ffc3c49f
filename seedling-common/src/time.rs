//! Timestamp column helpers

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Parse an RFC 3339 column value back into UTC
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}
