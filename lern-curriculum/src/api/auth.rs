//! Admin extractor for pipeline trigger endpoints

use crate::{ApiError, AppState};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use lern_common::api::{authorize_admin, USER_ID_HEADER};
use tracing::warn;

/// Verified admin caller
///
/// Rejects with 401 when `X-User-Id` is absent and 403 when the user is
/// unknown or lacks the admin flag. Handlers taking this extractor never run
/// for rejected callers.
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok());

        match authorize_admin(&state.db, user_id).await {
            Ok(admin_id) => Ok(AdminUser(admin_id)),
            Err(e) => {
                warn!(path = %parts.uri.path(), error = %e, "Admin check rejected request");
                Err(e.into())
            }
        }
    }
}
