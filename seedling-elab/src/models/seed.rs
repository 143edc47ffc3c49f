//! Seed catalog entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local record of an externally owned planning document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    pub seed_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Planned group size from the seed document
    pub estimated_participants: Option<i64>,
    /// Planned length in days from the seed document
    pub estimated_duration: Option<i64>,
    pub registered_at: DateTime<Utc>,
}
