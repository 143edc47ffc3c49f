//! Elaboration engine
//!
//! Drives the session state machine against the store. `start`,
//! `submit_answer` and `abandon` run under the seed's lock, so a seed has a
//! single writer at a time; status and history are plain reads.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::db;
use crate::extractors::{extract_or_empty, ExtractionRequest, MetadataExtractor};
use crate::models::schema::{is_populated, merge_delta, sanitize_delta};
use crate::models::{ElaborationSession, HistoryEntry, Metadata, MetadataSchema, Seed, SessionState};
use crate::services::metadata_deriver::derive_fields;
use crate::services::suggestion_builder::suggestion_for;
use crate::utils::SeedLocks;
use crate::validators::range_warnings;

/// Default bound on one extraction call
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors surfaced to callers of the engine
#[derive(Debug, Error)]
pub enum ElaborationError {
    /// Unknown seed, or no session ever existed for it
    #[error("{0}")]
    NotFound(String),

    /// Session unknown, owned by another seed, or already terminal
    #[error("{0}")]
    SessionMismatch(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] seedling_common::Error),
}

pub type ElaborationResult<T> = Result<T, ElaborationError>;

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub question: String,
    pub completeness: u8,
    pub suggestions: Vec<String>,
    /// True when an existing ACTIVE session was returned
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    /// `None` once the session is complete
    pub next_question: Option<String>,
    pub completeness: u8,
    /// Sanitized delta extracted from this answer
    pub extracted_metadata: Metadata,
    pub complete: bool,
    pub suggestions: Vec<String>,
    /// Advisory range warnings for extracted values
    pub validation_errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StatusOutcome {
    pub session_id: Uuid,
    pub state: SessionState,
    pub completeness: u8,
    pub metadata: Metadata,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AbandonOutcome {
    pub session_id: Uuid,
    pub state: SessionState,
    pub completeness: u8,
}

#[derive(Debug, Clone)]
pub struct HistoryOutcome {
    pub session_id: Uuid,
    pub entries: Vec<HistoryEntry>,
}

/// Session state machine bound to a store, a schema and an extractor
pub struct ElaborationEngine {
    db: SqlitePool,
    schema: Arc<MetadataSchema>,
    extractor: Arc<dyn MetadataExtractor>,
    extraction_timeout: Duration,
    locks: SeedLocks,
}

impl ElaborationEngine {
    pub fn new(
        db: SqlitePool,
        schema: Arc<MetadataSchema>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            db,
            schema,
            extractor,
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            locks: SeedLocks::new(),
        }
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    pub fn schema(&self) -> &MetadataSchema {
        &self.schema
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Start or resume the seed's elaboration session
    pub async fn start(&self, seed_id: &str) -> ElaborationResult<StartOutcome> {
        let _guard = self.locks.lock(seed_id).await;

        let seed = db::seeds::get_seed(&self.db, seed_id)
            .await?
            .ok_or_else(|| ElaborationError::NotFound(format!("Seed not found: {}", seed_id)))?;

        if let Some(session) = db::sessions::find_active(&self.db, seed_id).await? {
            tracing::info!(
                seed_id = %seed_id,
                session_id = %session.session_id,
                "Resuming active elaboration session"
            );
            return Ok(StartOutcome {
                session_id: session.session_id,
                question: self.pending_question(&session),
                completeness: session.completeness(&self.schema),
                suggestions: self.field_suggestion(&session, Some(&seed)),
                resumed: true,
            });
        }

        let session = ElaborationSession::new(seed_id.to_string(), &self.schema);
        db::sessions::insert_session(&self.db, &session).await?;

        tracing::info!(
            seed_id = %seed_id,
            session_id = %session.session_id,
            first_field = ?session.current_field,
            "Started elaboration session"
        );

        Ok(StartOutcome {
            session_id: session.session_id,
            question: self.pending_question(&session),
            completeness: session.completeness(&self.schema),
            suggestions: self.field_suggestion(&session, Some(&seed)),
            resumed: false,
        })
    }

    /// Process one answer for the seed's active session
    pub async fn submit_answer(
        &self,
        seed_id: &str,
        session_id: &str,
        answer: &str,
    ) -> ElaborationResult<AnswerOutcome> {
        let _guard = self.locks.lock(seed_id).await;

        let mut session = self.load_active(seed_id, session_id).await?;

        if answer.trim().is_empty() {
            return Err(ElaborationError::Validation(
                "Answer must not be empty".to_string(),
            ));
        }

        let pending_field = session
            .current_field
            .as_deref()
            .and_then(|name| self.schema.field(name))
            .cloned();

        let request = ExtractionRequest {
            answer: answer.to_string(),
            metadata: session.metadata().clone(),
            pending_field,
        };
        let outcome = extract_or_empty(self.extractor.as_ref(), &request, self.extraction_timeout).await;

        let mut delta = sanitize_delta(outcome.delta);

        // Derived values ride in the recorded delta so replay reproduces them
        let mut merged = session.metadata().clone();
        merge_delta(&mut merged, &delta);
        let derived = derive_fields(&merged, &delta);
        if !derived.is_empty() {
            tracing::debug!(
                session_id = %session.session_id,
                fields = ?derived.keys().collect::<Vec<_>>(),
                "Derived metadata fields"
            );
            delta.extend(derived);
        }

        let validation_errors = range_warnings(&delta, &self.schema);
        for warning in &validation_errors {
            tracing::debug!(session_id = %session.session_id, warning = %warning, "Extracted value out of range");
        }

        let transition = session.record_answer(answer.to_string(), delta.clone(), &self.schema);

        // The in-memory session is discarded if this fails
        db::sessions::append_turn(&self.db, &session).await?;

        let completeness = session.completeness(&self.schema);
        let complete = session.state == SessionState::Complete;

        if let Some(transition) = transition {
            tracing::info!(
                seed_id = %seed_id,
                session_id = %session.session_id,
                old_state = %transition.old_state,
                new_state = %transition.new_state,
                answers = session.history().len(),
                "Elaboration session complete"
            );
        } else {
            tracing::info!(
                seed_id = %seed_id,
                session_id = %session.session_id,
                completeness,
                extracted = delta.len(),
                next_field = ?session.current_field,
                "Answer recorded"
            );
        }

        let seed = db::seeds::get_seed(&self.db, seed_id).await?;
        let mut suggestions = outcome.suggestions;
        if complete {
            suggestions.extend(self.optional_suggestions(&session, seed.as_ref()));
        } else {
            suggestions.extend(self.field_suggestion(&session, seed.as_ref()));
        }

        Ok(AnswerOutcome {
            next_question: session.current_question.clone(),
            completeness,
            extracted_metadata: delta,
            complete,
            suggestions,
            validation_errors,
        })
    }

    /// Current state of the seed's most relevant session
    pub async fn get_status(&self, seed_id: &str) -> ElaborationResult<StatusOutcome> {
        let session = self.latest_session(seed_id).await?;

        Ok(StatusOutcome {
            session_id: session.session_id,
            state: session.state,
            completeness: session.completeness(&self.schema),
            missing_fields: session.missing_fields(&self.schema),
            metadata: session.metadata().clone(),
        })
    }

    /// Close the seed's active session without completing it
    pub async fn abandon(&self, seed_id: &str, session_id: &str) -> ElaborationResult<AbandonOutcome> {
        let _guard = self.locks.lock(seed_id).await;

        let mut session = self.load_active(seed_id, session_id).await?;
        let transition = session.transition_to(SessionState::Abandoned);
        db::sessions::update_session(&self.db, &session).await?;

        tracing::info!(
            seed_id = %seed_id,
            session_id = %session.session_id,
            old_state = %transition.old_state,
            answers = session.history().len(),
            "Elaboration session abandoned"
        );

        Ok(AbandonOutcome {
            session_id: session.session_id,
            state: session.state,
            completeness: session.completeness(&self.schema),
        })
    }

    /// Answer history of the session `get_status` reports
    pub async fn get_history(&self, seed_id: &str) -> ElaborationResult<HistoryOutcome> {
        let session = self.latest_session(seed_id).await?;

        Ok(HistoryOutcome {
            session_id: session.session_id,
            entries: session.history().to_vec(),
        })
    }

    async fn latest_session(&self, seed_id: &str) -> ElaborationResult<ElaborationSession> {
        db::sessions::latest_for_seed(&self.db, seed_id)
            .await?
            .ok_or_else(|| {
                ElaborationError::NotFound(format!("No elaboration session for seed {}", seed_id))
            })
    }

    /// Load `session_id` and check it is an ACTIVE session of `seed_id`
    async fn load_active(&self, seed_id: &str, session_id: &str) -> ElaborationResult<ElaborationSession> {
        let mismatch = || {
            ElaborationError::SessionMismatch(format!(
                "Session {} is not an active session of seed {}",
                session_id, seed_id
            ))
        };

        let id = Uuid::parse_str(session_id).map_err(|_| mismatch())?;
        let session = db::sessions::load_session(&self.db, id)
            .await?
            .ok_or_else(mismatch)?;

        if session.seed_id != seed_id {
            tracing::warn!(
                seed_id = %seed_id,
                session_id = %session_id,
                owner = %session.seed_id,
                "Session belongs to another seed"
            );
            return Err(mismatch());
        }

        if session.is_terminal() {
            return Err(ElaborationError::SessionMismatch(format!(
                "Session {} is {}",
                session_id, session.state
            )));
        }

        Ok(session)
    }

    fn pending_question(&self, session: &ElaborationSession) -> String {
        session
            .current_question
            .clone()
            .or_else(|| {
                self.schema
                    .next_unanswered(session.metadata())
                    .map(|field| field.prompt())
            })
            .unwrap_or_default()
    }

    /// Suggestion for the pending question
    fn field_suggestion(&self, session: &ElaborationSession, seed: Option<&Seed>) -> Vec<String> {
        session
            .current_field
            .as_deref()
            .and_then(|name| self.schema.field(name))
            .and_then(|field| suggestion_for(field, seed, session.metadata()))
            .into_iter()
            .collect()
    }

    /// Suggestions for optional fields still empty when the session completes
    fn optional_suggestions(&self, session: &ElaborationSession, seed: Option<&Seed>) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .filter(|field| !field.required)
            .filter(|field| !session.metadata().get(&field.name).is_some_and(is_populated))
            .filter_map(|field| suggestion_for(field, seed, session.metadata()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::FocusedFieldExtractor;
    use crate::models::{FieldDefinition, FieldKind, Seed};
    use chrono::Utc;
    use serde_json::json;

    async fn engine() -> ElaborationEngine {
        let pool = seedling_common::db::init_memory_database().await.unwrap();
        db::init_tables(&pool).await.unwrap();
        db::seeds::upsert_seed(
            &pool,
            &Seed {
                seed_id: "seed-1".into(),
                title: "Exchange".into(),
                description: None,
                estimated_participants: None,
                estimated_duration: None,
                registered_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let schema = MetadataSchema::new(vec![
            FieldDefinition::required("participantCount", "How many participants?")
                .with_kind(FieldKind::Integer)
                .with_range(16.0, 60.0)
                .with_suggestion("28 is a good starting point"),
            FieldDefinition::required("destination", "Where?"),
        ])
        .unwrap();

        ElaborationEngine::new(pool, Arc::new(schema), Arc::new(FocusedFieldExtractor::new()))
    }

    #[tokio::test]
    async fn test_focused_flow_with_suggestions_and_warnings() {
        let engine = engine().await;

        let start = engine.start("seed-1").await.unwrap();
        assert!(!start.resumed);
        assert_eq!(start.suggestions, vec!["28 is a good starting point"]);

        let answer = engine
            .submit_answer("seed-1", &start.session_id.to_string(), "only 8 of us")
            .await
            .unwrap();
        assert_eq!(answer.extracted_metadata["participantCount"], json!(8));
        assert_eq!(answer.completeness, 50);
        assert_eq!(answer.next_question.as_deref(), Some("Where?"));
        assert_eq!(answer.validation_errors.len(), 1);
        assert!(answer.suggestions.is_empty());
    }

    async fn youth_exchange_engine() -> ElaborationEngine {
        let pool = seedling_common::db::init_memory_database().await.unwrap();
        db::init_tables(&pool).await.unwrap();
        db::seeds::upsert_seed(
            &pool,
            &Seed {
                seed_id: "seed-yx".into(),
                title: "Climate exchange".into(),
                description: Some("Inclusion of disadvantaged youth through climate action".into()),
                estimated_participants: Some(32),
                estimated_duration: Some(10),
                registered_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        ElaborationEngine::new(
            pool,
            Arc::new(MetadataSchema::youth_exchange()),
            Arc::new(FocusedFieldExtractor::new()),
        )
    }

    #[tokio::test]
    async fn test_youth_exchange_walkthrough_with_derived_fields() {
        let engine = youth_exchange_engine().await;

        let start = engine.start("seed-yx").await.unwrap();
        assert_eq!(
            start.suggestions,
            vec!["Consider 32 participants as a good starting point."]
        );
        let id = start.session_id.to_string();
        let mut live = Metadata::new();

        let answer = engine.submit_answer("seed-yx", &id, "30 participants").await.unwrap();
        merge_delta(&mut live, &answer.extracted_metadata);
        assert_eq!(
            answer.suggestions,
            vec!["Based on 10 days and 30 participants, consider €650 per participant (Total: €19500)."]
        );

        let answer = engine
            .submit_answer("seed-yx", &id, "A total budget of 15000 euros")
            .await
            .unwrap();
        merge_delta(&mut live, &answer.extracted_metadata);
        assert_eq!(answer.extracted_metadata["totalBudget"], json!(15000.0));
        assert_eq!(answer.extracted_metadata["budgetPerParticipant"], json!(500));
        assert_eq!(answer.completeness, 40);
        assert!(answer.validation_errors.is_empty());

        let answer = engine.submit_answer("seed-yx", &id, "2 weeks").await.unwrap();
        merge_delta(&mut live, &answer.extracted_metadata);
        assert_eq!(answer.extracted_metadata["duration"], json!(14));
        assert!(answer.validation_errors.is_empty());

        let answer = engine.submit_answer("seed-yx", &id, "Valencia, Spain").await.unwrap();
        merge_delta(&mut live, &answer.extracted_metadata);
        assert!(answer.extracted_metadata.get("requirements").is_none());

        let answer = engine
            .submit_answer("seed-yx", &id, "Italy, Bosnia and Herzegovina and Portugal")
            .await
            .unwrap();
        merge_delta(&mut live, &answer.extracted_metadata);
        assert!(answer.complete);
        assert_eq!(
            answer.extracted_metadata["participantCountries"],
            json!(["Italy", "Bosnia and Herzegovina", "Portugal"])
        );
        let visas = &answer.extracted_metadata["requirements"]["visas"];
        assert_eq!(visas[0]["needed"], json!(false));
        assert_eq!(visas[1]["needed"], json!(true));
        assert_eq!(visas[2]["needed"], json!(false));
        assert_eq!(
            answer.suggestions,
            vec!["Based on your project description, consider: Inclusion and diversity, Environment and fight against climate change"]
        );

        let status = engine.get_status("seed-yx").await.unwrap();
        let history = engine.get_history("seed-yx").await.unwrap();
        assert_eq!(status.metadata, live);
        assert_eq!(crate::models::session::replay(&history.entries), live);
        assert_eq!(status.metadata["totalBudget"], json!(15000.0));
        assert_eq!(status.metadata["requirements"]["visas"], *visas);
    }

    #[tokio::test]
    async fn test_blank_answer_is_rejected_without_recording() {
        let engine = engine().await;
        let start = engine.start("seed-1").await.unwrap();

        let result = engine
            .submit_answer("seed-1", &start.session_id.to_string(), "   ")
            .await;
        assert!(matches!(result, Err(ElaborationError::Validation(_))));

        let history = engine.get_history("seed-1").await.unwrap();
        assert!(history.entries.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_session_id_is_a_mismatch() {
        let engine = engine().await;
        engine.start("seed-1").await.unwrap();

        let result = engine.submit_answer("seed-1", "not-a-uuid", "30").await;
        assert!(matches!(result, Err(ElaborationError::SessionMismatch(_))));
    }

    #[tokio::test]
    async fn test_unknown_seed() {
        let engine = engine().await;
        assert!(matches!(engine.start("nope").await, Err(ElaborationError::NotFound(_))));
        assert!(matches!(engine.get_status("nope").await, Err(ElaborationError::NotFound(_))));
        assert!(matches!(engine.get_history("nope").await, Err(ElaborationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_abandoned_session_rejects_answers() {
        let engine = engine().await;
        let start = engine.start("seed-1").await.unwrap();
        let id = start.session_id.to_string();

        let abandoned = engine.abandon("seed-1", &id).await.unwrap();
        assert_eq!(abandoned.state, SessionState::Abandoned);

        let result = engine.submit_answer("seed-1", &id, "30").await;
        assert!(matches!(result, Err(ElaborationError::SessionMismatch(_))));
        assert!(matches!(
            engine.abandon("seed-1", &id).await,
            Err(ElaborationError::SessionMismatch(_))
        ));
    }
}
