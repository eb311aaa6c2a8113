//! Pipeline trigger endpoints (admin only)
//!
//! Each call runs one pipeline to completion and returns its report. Unit
//! failures inside a run are part of the report, not an HTTP error.

use crate::api::auth::AdminUser;
use crate::models::{AuditReport, LinkingReport, ValidationReport};
use crate::services::{self, LinkingOptions, ValidationOptions};
use crate::{ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

/// POST /api/curriculum/link
///
/// **Request:** `{"app_id"?: "kopfrechnen", "batch_size"?: 10, "dry_run"?: false}`
pub async fn trigger_linking(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(options): Json<LinkingOptions>,
) -> ApiResult<Json<LinkingReport>> {
    info!(admin_id = %admin_id, app_id = ?options.app_id, dry_run = options.dry_run, "Linking run requested");

    let result = services::run_linking(&state.db, state.oracle.as_ref(), &state.config, &options).await;
    Ok(Json(state.track(result).await?))
}

/// POST /api/curriculum/validate
///
/// **Request:** `{"app_id"?: "kopfrechnen", "dry_run"?: false}`
pub async fn trigger_validation(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(options): Json<ValidationOptions>,
) -> ApiResult<Json<ValidationReport>> {
    info!(admin_id = %admin_id, app_id = ?options.app_id, dry_run = options.dry_run, "Validation pass requested");

    let result = services::run_validation(&state.db, state.oracle.as_ref(), &state.config, &options).await;
    Ok(Json(state.track(result).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditRequest {
    pub limit: Option<usize>,
}

/// POST /api/curriculum/audit
///
/// **Request:** `{"limit"?: 1}`
pub async fn trigger_audit(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(request): Json<AuditRequest>,
) -> ApiResult<Json<AuditReport>> {
    info!(admin_id = %admin_id, limit = ?request.limit, "Audit round requested");

    let result = services::run_audit(&state.db, state.oracle.as_ref(), &state.config, request.limit).await;
    Ok(Json(state.track(result).await?))
}

/// Build pipeline trigger routes
pub fn curriculum_routes() -> Router<AppState> {
    Router::new()
        .route("/api/curriculum/link", post(trigger_linking))
        .route("/api/curriculum/validate", post(trigger_validation))
        .route("/api/curriculum/audit", post(trigger_audit))
}
