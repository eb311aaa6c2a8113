//! lern-curriculum library interface
//!
//! Curriculum linking, link validation, quality audit and mastery tracking
//! for the learning platform. Exposed as a library for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod oracle;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lern_common::config::LernConfig;
use oracle::Oracle;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub oracle: Arc<dyn Oracle>,
    pub config: Arc<LernConfig>,
    /// Config file the service was started from, target of settings write-back
    pub config_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, oracle: Arc<dyn Oracle>, config: LernConfig) -> Self {
        Self {
            db,
            oracle,
            config: Arc::new(config),
            config_path: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Remember a failed run for `/health`, then hand the result on
    pub(crate) async fn track<T>(&self, result: lern_common::Result<T>) -> ApiResult<T> {
        if let Err(e) = &result {
            *self.last_error.write().await = Some(e.to_string());
        }
        result.map_err(ApiError::from)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::curriculum_routes())
        .merge(api::mastery_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
