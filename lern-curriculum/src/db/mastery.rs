//! Mastery record persistence
//!
//! Each graded event is read → [`MasteryRecord::apply_event`] → upsert inside
//! one transaction. Records are never deleted.

use crate::models::{MasteryRecord, MasteryStatus};
use crate::utils::retry_on_lock;
use chrono::{DateTime, Utc};
use lern_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

fn row_to_mastery(row: &SqliteRow) -> Result<MasteryRecord> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<MasteryStatus>().map_err(Error::Internal)?;

    Ok(MasteryRecord {
        user_id: row.try_get("user_id")?,
        node_id: row.try_get("curriculum_node_id")?,
        status,
        mastery_level: row.try_get("mastery_level")?,
        last_activity: row.try_get("last_activity")?,
    })
}

/// Load one record
pub async fn load_mastery<'e, E>(executor: E, user_id: &str, node_id: i64) -> Result<Option<MasteryRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT user_id, curriculum_node_id, status, mastery_level, last_activity
         FROM user_mastery WHERE user_id = ? AND curriculum_node_id = ?",
    )
    .bind(user_id)
    .bind(node_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(row_to_mastery).transpose()
}

/// All records of a user, by node
pub async fn list_mastery_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<MasteryRecord>> {
    let rows = sqlx::query(
        "SELECT user_id, curriculum_node_id, status, mastery_level, last_activity
         FROM user_mastery WHERE user_id = ? ORDER BY curriculum_node_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_mastery).collect()
}

/// Apply one graded event and persist the result
///
/// A concurrent writer can make the read-then-write upgrade fail with a lock
/// error; the whole transaction is then retried within `max_lock_wait_ms`.
pub async fn record_event(
    pool: &SqlitePool,
    user_id: &str,
    node_id: i64,
    points: i64,
    now: DateTime<Utc>,
    max_lock_wait_ms: u64,
) -> Result<MasteryRecord> {
    retry_on_lock("record mastery event", max_lock_wait_ms, || async {
        let mut tx = pool.begin().await?;

        let existing = load_mastery(&mut *tx, user_id, node_id).await?;
        let record = MasteryRecord::apply_event(existing, user_id, node_id, points, now);

        sqlx::query(
            "INSERT INTO user_mastery (user_id, curriculum_node_id, status, mastery_level, last_activity)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id, curriculum_node_id) DO UPDATE SET
                status = excluded.status,
                mastery_level = excluded.mastery_level,
                last_activity = excluded.last_activity",
        )
        .bind(&record.user_id)
        .bind(record.node_id)
        .bind(record.status.as_str())
        .bind(record.mastery_level)
        .bind(record.last_activity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    })
    .await
}
