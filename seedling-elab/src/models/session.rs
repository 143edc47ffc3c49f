//! Elaboration session state machine
//!
//! A session progresses ACTIVE → COMPLETE or ACTIVE → ABANDONED and never
//! leaves a terminal state. Metadata is a cache derived from the
//! append-only history; the only way to change it is `record_answer`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::schema::{merge_delta, Metadata, MetadataSchema};
use crate::validators::completeness;

/// Elaboration session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Waiting for the answer to `current_question`
    Active,
    /// Every required field populated
    Complete,
    /// Closed by the client before completion
    Abandoned,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "ACTIVE",
            SessionState::Complete => "COMPLETE",
            SessionState::Abandoned => "ABANDONED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = seedling_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SessionState::Active),
            "COMPLETE" => Ok(SessionState::Complete),
            "ABANDONED" => Ok(SessionState::Abandoned),
            other => Err(seedling_common::Error::Internal(format!(
                "Unknown session state: {}",
                other
            ))),
        }
    }
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Question text as it was asked
    pub question: String,
    /// Schema field the question targeted
    pub field: String,
    pub answer: String,
    /// Sanitized delta merged into metadata for this answer
    pub delta: Metadata,
    pub recorded_at: DateTime<Utc>,
}

/// State change produced by a transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Elaboration session (in-memory view rebuilt from the store)
#[derive(Debug, Clone)]
pub struct ElaborationSession {
    pub session_id: Uuid,
    pub seed_id: String,
    pub state: SessionState,
    /// Field the pending question targets; `None` once terminal
    pub current_field: Option<String>,
    /// Pending question text; `None` once terminal
    pub current_question: Option<String>,
    history: Vec<HistoryEntry>,
    metadata: Metadata,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ElaborationSession {
    /// Create a new ACTIVE session asking the schema's first required field
    pub fn new(seed_id: String, schema: &MetadataSchema) -> Self {
        let metadata = Metadata::new();
        let first = schema.next_unanswered(&metadata);
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            seed_id,
            state: SessionState::Active,
            current_field: first.map(|f| f.name.clone()),
            current_question: first.map(|f| f.prompt()),
            history: Vec::new(),
            metadata,
            started_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    /// Rebuild a session from stored columns and its history
    ///
    /// Metadata is recomputed by replaying every delta in order.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        session_id: Uuid,
        seed_id: String,
        state: SessionState,
        current_field: Option<String>,
        current_question: Option<String>,
        history: Vec<HistoryEntry>,
        started_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Self {
        let metadata = replay(&history);

        Self {
            session_id,
            seed_id,
            state,
            current_field,
            current_question,
            history,
            metadata,
            started_at,
            updated_at,
            ended_at,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn completeness(&self, schema: &MetadataSchema) -> u8 {
        completeness::score(&self.metadata, schema)
    }

    pub fn missing_fields(&self, schema: &MetadataSchema) -> Vec<String> {
        completeness::missing_fields(&self.metadata, schema)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Append an answer, merge its delta and advance the question
    ///
    /// Completes the session when no required field is missing; otherwise
    /// the next question is the first unanswered required field in schema
    /// order (re-asking the same field if nothing was extracted). Returns
    /// the transition when the session completed.
    pub fn record_answer(
        &mut self,
        answer: String,
        delta: Metadata,
        schema: &MetadataSchema,
    ) -> Option<StateTransition> {
        let now = Utc::now();

        merge_delta(&mut self.metadata, &delta);
        self.history.push(HistoryEntry {
            question: self.current_question.clone().unwrap_or_default(),
            field: self.current_field.clone().unwrap_or_default(),
            answer,
            delta,
            recorded_at: now,
        });
        self.updated_at = now;

        match schema.next_unanswered(&self.metadata) {
            Some(next) => {
                self.current_field = Some(next.name.clone());
                self.current_question = Some(next.prompt());
                None
            }
            None => Some(self.transition_to(SessionState::Complete)),
        }
    }

    /// Move to a terminal state
    pub fn transition_to(&mut self, new_state: SessionState) -> StateTransition {
        let now = Utc::now();
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: now,
        };
        self.state = new_state;
        self.updated_at = now;

        if new_state.is_terminal() {
            self.ended_at = Some(now);
            self.current_field = None;
            self.current_question = None;
        }

        transition
    }
}

/// Fold history deltas into metadata, in order
pub fn replay(history: &[HistoryEntry]) -> Metadata {
    let mut metadata = Metadata::new();
    for entry in history {
        merge_delta(&mut metadata, &entry.delta);
    }
    metadata
}
