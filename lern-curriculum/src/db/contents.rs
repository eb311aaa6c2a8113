//! Content row queries and review counters
//!
//! Content rows belong to the authoring tooling. This subsystem reads them
//! and bumps `ai_reviewed_counter` / `flag_counter`, always with a single
//! server-side `UPDATE ... SET c = c + 1` so concurrent audit runs cannot
//! lose increments.

use super::placeholders;
use crate::models::ContentItem;
use lern_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

const CONTENT_COLUMNS: &str =
    "id, app_id, data, ai_generated, human_verified, ai_reviewed_counter, flag_counter";

fn row_to_content(row: &SqliteRow) -> Result<ContentItem> {
    let raw: String = row.try_get("data")?;
    // Payloads are JSON by convention; anything else is kept as a string
    let data = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));

    Ok(ContentItem {
        id: row.try_get("id")?,
        app_id: row.try_get("app_id")?,
        data,
        ai_generated: row.try_get::<i64, _>("ai_generated")? != 0,
        human_verified: row.try_get::<i64, _>("human_verified")? != 0,
        ai_reviewed_counter: row.try_get("ai_reviewed_counter")?,
        flag_counter: row.try_get("flag_counter")?,
    })
}

/// All content rows of one app, by id
pub async fn load_contents_for_app(pool: &SqlitePool, app_id: &str) -> Result<Vec<ContentItem>> {
    let sql = format!("SELECT {} FROM contents WHERE app_id = ? ORDER BY id", CONTENT_COLUMNS);
    let rows = sqlx::query(&sql).bind(app_id).fetch_all(pool).await?;
    rows.iter().map(row_to_content).collect()
}

/// Load one content row
pub async fn load_content(pool: &SqlitePool, id: i64) -> Result<Option<ContentItem>> {
    let sql = format!("SELECT {} FROM contents WHERE id = ?", CONTENT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(row_to_content).transpose()
}

/// Distinct app ids that own content
pub async fn load_app_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT app_id FROM contents ORDER BY app_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Review queue head: AI-generated, unverified, not excluded
///
/// Least-reviewed first, most-flagged first among equals.
pub async fn load_audit_candidates(
    pool: &SqlitePool,
    excluded_apps: &[String],
    limit: i64,
) -> Result<Vec<ContentItem>> {
    let exclusion = if excluded_apps.is_empty() {
        String::new()
    } else {
        format!("AND app_id NOT IN ({})", placeholders(excluded_apps.len()))
    };

    let sql = format!(
        "SELECT {}
         FROM contents
         WHERE ai_generated = 1 AND human_verified = 0 {}
         ORDER BY ai_reviewed_counter ASC, flag_counter DESC, id ASC
         LIMIT ?",
        CONTENT_COLUMNS, exclusion
    );

    let mut query = sqlx::query(&sql);
    for app in excluded_apps {
        query = query.bind(app);
    }
    let rows = query.bind(limit).fetch_all(pool).await?;
    rows.iter().map(row_to_content).collect()
}

/// Atomically add one to `ai_reviewed_counter`
///
/// Returns false if the row no longer exists.
pub async fn increment_review_counter(pool: &SqlitePool, content_id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE contents SET ai_reviewed_counter = ai_reviewed_counter + 1 WHERE id = ?")
        .bind(content_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Atomically add one to `flag_counter` (inside the caller's transaction)
pub async fn increment_flag_counter<'e, E>(executor: E, content_id: i64) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE contents SET flag_counter = flag_counter + 1 WHERE id = ?")
        .bind(content_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}
