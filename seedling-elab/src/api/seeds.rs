//! Seed catalog API
//!
//! PUT /seeds/:seed_id registers (or renames) a seed owned by the external
//! document service so elaboration can start against it.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::put,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::Seed;
use crate::AppState;

const MAX_SEED_ID_LEN: usize = 128;

/// PUT /seeds/:seed_id request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSeedRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Planned group size, used for suggestions
    #[serde(default)]
    pub estimated_participants: Option<i64>,
    /// Planned length in days, used for suggestions
    #[serde(default)]
    pub estimated_duration: Option<i64>,
}

/// PUT /seeds/:seed_id
///
/// Idempotent: re-registering updates everything except `registeredAt`.
pub async fn register_seed(
    State(state): State<AppState>,
    Path(seed_id): Path<String>,
    payload: Result<Json<RegisterSeedRequest>, JsonRejection>,
) -> ApiResult<Json<Seed>> {
    let Json(request) = payload?;

    if seed_id.trim().is_empty() || seed_id.len() > MAX_SEED_ID_LEN {
        return Err(ApiError::Validation(format!(
            "Seed id must be 1-{} characters",
            MAX_SEED_ID_LEN
        )));
    }
    if request.title.trim().is_empty() {
        return Err(ApiError::Validation("Seed title must not be empty".to_string()));
    }
    for (name, value) in [
        ("estimatedParticipants", request.estimated_participants),
        ("estimatedDuration", request.estimated_duration),
    ] {
        if value.is_some_and(|v| v <= 0) {
            return Err(ApiError::Validation(format!("{} must be positive", name)));
        }
    }

    let seed = Seed {
        seed_id,
        title: request.title.trim().to_string(),
        description: request.description.filter(|d| !d.trim().is_empty()),
        estimated_participants: request.estimated_participants,
        estimated_duration: request.estimated_duration,
        registered_at: chrono::Utc::now(),
    };

    let stored = crate::db::seeds::upsert_seed(state.engine.db(), &seed).await?;
    tracing::info!(seed_id = %stored.seed_id, title = %stored.title, "Seed registered");

    Ok(Json(stored))
}

/// Build seed catalog routes
pub fn seed_routes() -> Router<AppState> {
    Router::new().route("/seeds/:seed_id", put(register_seed))
}
