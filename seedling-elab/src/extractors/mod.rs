//! Metadata extraction adapters
//!
//! An extractor turns one free-text answer plus the current metadata into a
//! metadata delta and advisory suggestions. The session engine treats every
//! extractor failure (including a timeout) as an empty outcome so a session
//! can always re-ask or move on.
//!
//! # Adapters
//! - [`FocusedFieldExtractor`]: deterministic, assigns the answer to the
//!   pending field according to its declared kind
//! - [`HttpExtractor`]: delegates to an external extraction service

pub mod focused;
pub mod http;

pub use focused::FocusedFieldExtractor;
pub use http::HttpExtractor;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::schema::{FieldDefinition, Metadata};

/// Extraction errors
///
/// Internal only: never surfaced to API callers.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extractor unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed extractor response: {0}")]
    Malformed(String),
}

/// Input to one extraction call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub answer: String,
    /// Metadata accumulated so far (read-only snapshot)
    pub metadata: Metadata,
    /// Field the question being answered targets
    pub pending_field: Option<FieldDefinition>,
}

/// Result of one extraction call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// Fields recognised in the answer (possibly empty)
    #[serde(default)]
    pub delta: Metadata,
    /// Advisory prompts or example values for upcoming questions
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ExtractionOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Extraction capability injected into the session engine
///
/// Implementations must be free of side effects on session state and should
/// return an empty delta rather than an error for low-confidence input.
#[async_trait::async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError>;
}

/// Run an extractor bounded by `timeout`, degrading any failure to an
/// empty outcome
pub async fn extract_or_empty(
    extractor: &dyn MetadataExtractor,
    request: &ExtractionRequest,
    timeout: Duration,
) -> ExtractionOutcome {
    let result = match tokio::time::timeout(timeout, extractor.extract(request)).await {
        Ok(result) => result,
        Err(_) => Err(ExtractionError::Timeout(timeout)),
    };

    match result {
        Ok(outcome) => {
            tracing::debug!(
                extractor = extractor.name(),
                fields = outcome.delta.len(),
                "Extraction complete"
            );
            outcome
        }
        Err(e) => {
            tracing::warn!(
                extractor = extractor.name(),
                error = %e,
                "Extraction failed, continuing with empty delta"
            );
            ExtractionOutcome::empty()
        }
    }
}
