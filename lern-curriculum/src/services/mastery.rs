//! Mastery tracker service
//!
//! Validates graded events and hands them to the store, which applies the
//! state machine in one transaction.

use crate::db;
use crate::models::MasteryRecord;
use chrono::Utc;
use lern_common::config::LernConfig;
use lern_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

/// One graded event as received from the game layer
#[derive(Debug, Clone, Deserialize)]
pub struct MasteryEvent {
    pub user_id: String,
    pub node_id: i64,
    pub points: i64,
}

/// Record a graded event and return the updated record
///
/// Points must be positive; anything above the ceiling is absorbed by it.
pub async fn record_mastery_event(
    db: &SqlitePool,
    config: &LernConfig,
    event: &MasteryEvent,
) -> Result<MasteryRecord> {
    if event.user_id.trim().is_empty() {
        return Err(Error::InvalidInput("user_id must not be empty".to_string()));
    }
    if event.points <= 0 {
        return Err(Error::InvalidInput(format!(
            "points must be positive, got {}",
            event.points
        )));
    }
    if db::curriculum::load_node(db, event.node_id).await?.is_none() {
        return Err(Error::NotFound(format!("curriculum node {}", event.node_id)));
    }

    let record = db::mastery::record_event(
        db,
        &event.user_id,
        event.node_id,
        event.points,
        Utc::now(),
        config.database.max_lock_wait_ms,
    )
    .await?;

    info!(
        user_id = %record.user_id,
        node_id = record.node_id,
        points = event.points,
        level = record.mastery_level,
        status = record.status.as_str(),
        "Mastery event recorded"
    );

    Ok(record)
}

/// A user's mastery records
pub async fn user_mastery(db: &SqlitePool, user_id: &str) -> Result<Vec<MasteryRecord>> {
    db::mastery::list_mastery_for_user(db, user_id).await
}
