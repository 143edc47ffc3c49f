//! seedling-elab library - seed elaboration service
//!
//! Walks a user through clarifying questions about a planning document
//! ("seed"), extracts structured metadata from each free-text answer and
//! reports completeness against a metadata schema.

use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod models;
pub mod services;
pub mod utils;
pub mod validators;

pub use services::ElaborationEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ElaborationEngine>,
    /// Accepted bearer tokens; empty disables authentication
    pub auth_tokens: Arc<HashSet<String>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: ElaborationEngine, auth_tokens: Vec<String>) -> Self {
        Self {
            engine: Arc::new(engine),
            auth_tokens: Arc::new(auth_tokens.into_iter().collect()),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` is public; everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::elaborate_routes())
        .merge(api::seed_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
