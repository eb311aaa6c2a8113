//! Mastery endpoints

use crate::models::MasteryRecord;
use crate::services::{self, MasteryEvent};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

/// POST /api/mastery/events
///
/// **Request:** `{"user_id": "u1", "node_id": 279, "points": 5}`
/// **Response:** the updated mastery record
///
/// **Errors:**
/// - 400 Bad Request: non-positive points or empty user id
/// - 404 Not Found: unknown curriculum node
pub async fn post_mastery_event(
    State(state): State<AppState>,
    Json(event): Json<MasteryEvent>,
) -> ApiResult<Json<MasteryRecord>> {
    let record = services::record_mastery_event(&state.db, &state.config, &event).await?;
    Ok(Json(record))
}

/// GET /api/mastery/:user_id
pub async fn get_user_mastery(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<MasteryRecord>>> {
    let records = services::user_mastery(&state.db, &user_id).await?;
    Ok(Json(records))
}

/// Build mastery routes
pub fn mastery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/mastery/events", post(post_mastery_event))
        .route("/api/mastery/:user_id", get(get_user_mastery))
}
