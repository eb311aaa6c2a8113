//! Admin role check for pipeline trigger endpoints
//!
//! Token verification happens upstream; the verified caller id arrives in
//! the `X-User-Id` header. This module only answers whether that user
//! exists and carries the admin flag.

use sqlx::SqlitePool;

/// Header carrying the caller id forwarded by the auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

// ========================================
// Error Types
// ========================================

/// Admin authorization error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAuthError {
    /// No caller identity on the request
    MissingIdentity,

    /// Caller id has no user record
    UnknownUser(String),

    /// User exists but is not an admin
    NotAdmin(String),

    /// Database error loading the user record
    DatabaseError(String),
}

impl std::fmt::Display for AdminAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAuthError::MissingIdentity => write!(f, "Missing caller identity"),
            AdminAuthError::UnknownUser(id) => write!(f, "Unknown user: {}", id),
            AdminAuthError::NotAdmin(id) => write!(f, "User {} is not an admin", id),
            AdminAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for AdminAuthError {}

/// Role information read from the users table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRole {
    pub user_id: String,
    pub is_admin: bool,
}

/// Load a user's role, `None` if the user does not exist
pub async fn load_user_role(db: &SqlitePool, user_id: &str) -> Result<Option<UserRole>, AdminAuthError> {
    let row: Option<(String, i64)> = sqlx::query_as("SELECT id, is_admin FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await
        .map_err(|e| AdminAuthError::DatabaseError(e.to_string()))?;

    Ok(row.map(|(user_id, is_admin)| UserRole {
        user_id,
        is_admin: is_admin != 0,
    }))
}

/// Decide admin access from the caller id and its loaded role
///
/// # Examples
///
/// ```
/// use lern_common::api::auth::{check_admin, AdminAuthError, UserRole};
///
/// let admin = UserRole { user_id: "a1".into(), is_admin: true };
/// assert!(check_admin("a1", Some(&admin)).is_ok());
/// assert_eq!(check_admin("x", None), Err(AdminAuthError::UnknownUser("x".into())));
/// ```
pub fn check_admin(user_id: &str, role: Option<&UserRole>) -> Result<(), AdminAuthError> {
    match role {
        None => Err(AdminAuthError::UnknownUser(user_id.to_string())),
        Some(role) if !role.is_admin => Err(AdminAuthError::NotAdmin(user_id.to_string())),
        Some(_) => Ok(()),
    }
}

/// Full admin check: identity present, user exists, admin flag set
///
/// Returns the admin's user id on success.
pub async fn authorize_admin(db: &SqlitePool, user_id: Option<&str>) -> Result<String, AdminAuthError> {
    let user_id = user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AdminAuthError::MissingIdentity)?;

    let role = load_user_role(db, user_id).await?;
    check_admin(user_id, role.as_ref())?;

    Ok(user_id.to_string())
}
