//! Elaboration API handlers
//!
//! POST /seeds/:seed_id/elaborate/start, POST .../answer, GET .../status,
//! POST .../abandon, GET .../history

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Metadata, SessionState};
use crate::AppState;

/// POST /seeds/:seed_id/elaborate/answer request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub session_id: String,
    pub answer: String,
}

/// POST /seeds/:seed_id/elaborate/abandon request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonRequest {
    pub session_id: String,
}

/// POST /seeds/:seed_id/elaborate/start response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: Uuid,
    pub question: String,
    pub completeness: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub resumed: bool,
}

/// POST /seeds/:seed_id/elaborate/answer response
///
/// `nextQuestion` is `null` once complete; `extractedMetadata` is `{}` when
/// nothing was extracted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub next_question: Option<String>,
    pub completeness: u8,
    pub extracted_metadata: Metadata,
    pub complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

/// GET /seeds/:seed_id/elaborate/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub state: SessionState,
    pub completeness: u8,
    pub metadata: Metadata,
    pub missing_fields: Vec<String>,
}

/// POST /seeds/:seed_id/elaborate/abandon response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonResponse {
    pub session_id: Uuid,
    pub state: SessionState,
    pub completeness: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub question: String,
    pub field: String,
    pub answer: String,
    pub extracted_metadata: Metadata,
    pub recorded_at: DateTime<Utc>,
}

/// GET /seeds/:seed_id/elaborate/history response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub entries: Vec<HistoryEntryResponse>,
}

/// POST /seeds/:seed_id/elaborate/start
///
/// Creates a session, or returns the seed's active one.
pub async fn start_elaboration(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
) -> ApiResult<Json<StartResponse>> {
    let outcome = state.engine.start(&seed_id).await?;

    Ok(Json(StartResponse {
        session_id: outcome.session_id,
        question: outcome.question,
        completeness: outcome.completeness,
        suggestions: outcome.suggestions,
        resumed: outcome.resumed,
    }))
}

/// POST /seeds/:seed_id/elaborate/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> ApiResult<Json<AnswerResponse>> {
    let Json(request) = payload?;

    let outcome = state
        .engine
        .submit_answer(&seed_id, &request.session_id, &request.answer)
        .await?;

    Ok(Json(AnswerResponse {
        next_question: outcome.next_question,
        completeness: outcome.completeness,
        extracted_metadata: outcome.extracted_metadata,
        complete: outcome.complete,
        suggestions: outcome.suggestions,
        validation_errors: outcome.validation_errors,
    }))
}

/// GET /seeds/:seed_id/elaborate/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let outcome = state.engine.get_status(&seed_id).await?;

    Ok(Json(StatusResponse {
        session_id: outcome.session_id,
        state: outcome.state,
        completeness: outcome.completeness,
        metadata: outcome.metadata,
        missing_fields: outcome.missing_fields,
    }))
}

/// POST /seeds/:seed_id/elaborate/abandon
pub async fn abandon_elaboration(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
    payload: Result<Json<AbandonRequest>, JsonRejection>,
) -> ApiResult<Json<AbandonResponse>> {
    let Json(request) = payload?;

    let outcome = state.engine.abandon(&seed_id, &request.session_id).await?;

    Ok(Json(AbandonResponse {
        session_id: outcome.session_id,
        state: outcome.state,
        completeness: outcome.completeness,
    }))
}

/// GET /seeds/:seed_id/elaborate/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let outcome = state.engine.get_history(&seed_id).await?;

    let entries = outcome
        .entries
        .into_iter()
        .map(|entry| HistoryEntryResponse {
            question: entry.question,
            field: entry.field,
            answer: entry.answer,
            extracted_metadata: entry.delta,
            recorded_at: entry.recorded_at,
        })
        .collect();

    Ok(Json(HistoryResponse {
        session_id: outcome.session_id,
        entries,
    }))
}

/// Build elaboration routes
pub fn elaborate_routes() -> Router<AppState> {
    Router::new()
        .route("/seeds/:seed_id/elaborate/start", post(start_elaboration))
        .route("/seeds/:seed_id/elaborate/answer", post(submit_answer))
        .route("/seeds/:seed_id/elaborate/status", get(get_status))
        .route("/seeds/:seed_id/elaborate/abandon", post(abandon_elaboration))
        .route("/seeds/:seed_id/elaborate/history", get(get_history))
}
