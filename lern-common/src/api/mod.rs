//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//!
//! Services wrap these with framework-specific extractors (Axum, etc.).

pub mod auth;

pub use auth::{authorize_admin, check_admin, load_user_role, AdminAuthError, UserRole, USER_ID_HEADER};
