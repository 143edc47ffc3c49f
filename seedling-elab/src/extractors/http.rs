//! Remote extraction service client
//!
//! POSTs the extraction request as JSON (`{answer, metadata, pendingField}`)
//! and expects `{delta, suggestions}` back. Used to plug a language model
//! service in behind the same contract as the focused extractor.

use std::time::Duration;

use super::{ExtractionError, ExtractionOutcome, ExtractionRequest, MetadataExtractor};

const USER_AGENT: &str = concat!("seedling-elab/", env!("CARGO_PKG_VERSION"));

/// HTTP extraction client
pub struct HttpExtractor {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    /// Create a client for `endpoint`
    ///
    /// `timeout` bounds the HTTP exchange itself; the engine applies its own
    /// extraction timeout on top.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ExtractionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for HttpExtractor {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            pending_field = request.pending_field.as_ref().map(|f| f.name.as_str()),
            "Requesting remote extraction"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let outcome: ExtractionOutcome = response
            .json()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        Ok(outcome)
    }
}
