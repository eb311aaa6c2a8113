//! Append-only feedback queue for human review

use crate::models::{FeedbackEntry, NewFeedback};
use lern_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

fn row_to_feedback(row: &SqliteRow) -> Result<FeedbackEntry> {
    Ok(FeedbackEntry {
        id: row.try_get("id")?,
        app_id: row.try_get("app_id")?,
        target_id: row.try_get("target_id")?,
        comment: row.try_get("comment")?,
        error_type: row.try_get("error_type")?,
        resolved: row.try_get::<i64, _>("resolved")? != 0,
    })
}

/// Append an unresolved entry, returning its id
///
/// Takes any executor so the audit can write it in the same transaction as
/// the flag increment.
pub async fn append_feedback<'e, E>(executor: E, entry: &NewFeedback) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO feedback (app_id, target_id, comment, error_type, resolved) VALUES (?, ?, ?, ?, 0)",
    )
    .bind(&entry.app_id)
    .bind(&entry.target_id)
    .bind(&entry.comment)
    .bind(&entry.error_type)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Entries pointing at one target, oldest first
pub async fn load_feedback_for_target(pool: &SqlitePool, target_id: &str) -> Result<Vec<FeedbackEntry>> {
    let rows = sqlx::query(
        "SELECT id, app_id, target_id, comment, error_type, resolved
         FROM feedback WHERE target_id = ? ORDER BY id",
    )
    .bind(target_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_feedback).collect()
}

/// Open review queue, oldest first
pub async fn load_unresolved(pool: &SqlitePool) -> Result<Vec<FeedbackEntry>> {
    let rows = sqlx::query(
        "SELECT id, app_id, target_id, comment, error_type, resolved
         FROM feedback WHERE resolved = 0 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_feedback).collect()
}
