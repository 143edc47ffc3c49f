//! Shared fixtures for seedling-elab integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use seedling_elab::extractors::{
    ExtractionError, ExtractionOutcome, ExtractionRequest, MetadataExtractor,
};
use seedling_elab::models::{FieldDefinition, Metadata, MetadataSchema, Seed};
use seedling_elab::{db, ElaborationEngine};

/// Maps exact answers to fixed deltas; anything else extracts nothing
#[derive(Default)]
pub struct ScriptedExtractor {
    script: HashMap<String, Metadata>,
    suggestions: Vec<String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, answer: &str, pairs: &[(&str, Value)]) -> Self {
        let delta = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.script.insert(answer.to_string(), delta);
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        Ok(ExtractionOutcome {
            delta: self.script.get(&request.answer).cloned().unwrap_or_default(),
            suggestions: self.suggestions.clone(),
        })
    }
}

/// Never answers within any reasonable timeout
pub struct StalledExtractor;

#[async_trait::async_trait]
impl MetadataExtractor for StalledExtractor {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn extract(&self, _request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(ExtractionOutcome {
            delta: [("participants".to_string(), json!("too late"))].into_iter().collect(),
            suggestions: Vec::new(),
        })
    }
}

/// Echoes the answer into the pending field
pub struct EchoExtractor;

#[async_trait::async_trait]
impl MetadataExtractor for EchoExtractor {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, ExtractionError> {
        let mut delta = Metadata::new();
        if let Some(field) = &request.pending_field {
            delta.insert(field.name.clone(), json!(request.answer));
        }
        Ok(ExtractionOutcome {
            delta,
            suggestions: Vec::new(),
        })
    }
}

/// Required participants, location, dates plus optional notes
pub fn three_field_schema() -> MetadataSchema {
    MetadataSchema::new(vec![
        FieldDefinition::required("participants", "participants?"),
        FieldDefinition::required("location", "location?"),
        FieldDefinition::required("dates", "dates?"),
        FieldDefinition::optional("notes", "notes?"),
    ])
    .unwrap()
}

/// Scripted extractor for the participants / location / dates walkthrough
pub fn walkthrough_extractor() -> ScriptedExtractor {
    ScriptedExtractor::new()
        .on("30 people", &[("participants", json!("30 people"))])
        .on("Barcelona", &[("location", json!("Barcelona"))])
        .on("July 15-21", &[("dates", json!("July 15-21"))])
        .on("mid July", &[("dates", json!("mid July"))])
}

pub async fn memory_pool() -> SqlitePool {
    let pool = seedling_common::db::init_memory_database().await.unwrap();
    db::init_tables(&pool).await.unwrap();
    pool
}

pub async fn file_pool(path: &Path) -> SqlitePool {
    db::init_database_pool(path).await.unwrap()
}

pub async fn register_seed(pool: &SqlitePool, seed_id: &str) {
    db::seeds::upsert_seed(
        pool,
        &Seed {
            seed_id: seed_id.to_string(),
            title: format!("Seed {}", seed_id),
            description: None,
            estimated_participants: None,
            estimated_duration: None,
            registered_at: Utc::now(),
        },
    )
    .await
    .unwrap();
}

pub fn engine_with(pool: SqlitePool, extractor: impl MetadataExtractor + 'static) -> ElaborationEngine {
    ElaborationEngine::new(pool, Arc::new(three_field_schema()), Arc::new(extractor))
}

/// In-memory engine with `seed-1` registered and the walkthrough script
pub async fn walkthrough_engine() -> ElaborationEngine {
    let pool = memory_pool().await;
    register_seed(&pool, "seed-1").await;
    engine_with(pool, walkthrough_extractor())
}
