//! Settings API endpoint
//!
//! Provides POST /api/settings/oracle_api_key (admin only)

use crate::api::auth::AdminUser;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/oracle_api_key
///
/// **Request:** `{"api_key": "sk-..."}`
///
/// **Behavior:**
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Sync to TOML when the service was started from a config file (best-effort)
///
/// The running oracle client keeps its key; the new one applies on restart.
pub async fn set_oracle_api_key(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    crate::db::settings::set_oracle_api_key(&state.db, payload.api_key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    info!(admin_id = %admin_id, "Oracle API key configured via settings endpoint");

    if let Some(path) = &state.config_path {
        if let Err(e) = crate::config::sync_api_key_to_toml(&payload.api_key, path) {
            warn!("TOML sync failed (database write succeeded): {}", e);
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Oracle API key saved; restart the service to apply it".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/oracle_api_key", post(set_oracle_api_key))
}
