//! Content ↔ curriculum links and per-pair app configuration

use crate::models::ContentLink;
use lern_common::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Insert a batch of links in one transaction
///
/// Existing pairs are left untouched. Returns the number of rows actually
/// created.
pub async fn insert_links(pool: &SqlitePool, links: &[ContentLink]) -> Result<u64> {
    if links.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for link in links {
        let result = sqlx::query(
            "INSERT INTO content_curriculum (content_id, curriculum_node_id) VALUES (?, ?)
             ON CONFLICT(content_id, curriculum_node_id) DO NOTHING",
        )
        .bind(link.content_id)
        .bind(link.node_id)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// All links, ordered
pub async fn load_links(pool: &SqlitePool) -> Result<Vec<ContentLink>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT content_id, curriculum_node_id FROM content_curriculum ORDER BY content_id, curriculum_node_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(content_id, node_id)| ContentLink { content_id, node_id })
        .collect())
}

/// Distinct `(app, node)` pairing derived from existing links
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedPair {
    pub app_id: String,
    pub node_id: i64,
    pub code: String,
    pub title: String,
    pub description: String,
    pub link_count: i64,
}

/// Distinct `(app, node)` pairs currently linked
///
/// Links whose content row or node has vanished are not reported.
pub async fn load_linked_pairs(pool: &SqlitePool, app_filter: Option<&str>) -> Result<Vec<LinkedPair>> {
    let rows = sqlx::query(
        "SELECT c.app_id AS app_id, n.id AS node_id, n.code AS code, n.title AS title,
                n.description AS description, COUNT(*) AS link_count
         FROM content_curriculum cc
         JOIN contents c ON c.id = cc.content_id
         JOIN curriculum_nodes n ON n.id = cc.curriculum_node_id
         WHERE (? IS NULL OR c.app_id = ?)
         GROUP BY c.app_id, n.id
         ORDER BY c.app_id, n.code",
    )
    .bind(app_filter)
    .bind(app_filter)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(LinkedPair {
                app_id: row.try_get("app_id")?,
                node_id: row.try_get("node_id")?,
                code: row.try_get("code")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                link_count: row.try_get("link_count")?,
            })
        })
        .collect()
}

/// Rows removed by [`delete_pair_cascade`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeResult {
    pub links: u64,
    pub configs: u64,
}

/// Remove an `(app, node)` pairing entirely
///
/// Deletes every link from that app's content to the node plus the app's
/// per-node configuration row, atomically. Other pairings are untouched.
pub async fn delete_pair_cascade(pool: &SqlitePool, app_id: &str, node_id: i64) -> Result<CascadeResult> {
    let mut tx = pool.begin().await?;

    let links = sqlx::query(
        "DELETE FROM content_curriculum
         WHERE curriculum_node_id = ?
           AND content_id IN (SELECT id FROM contents WHERE app_id = ?)",
    )
    .bind(node_id)
    .bind(app_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let configs = sqlx::query("DELETE FROM app_curriculum_config WHERE app_id = ? AND curriculum_node_id = ?")
        .bind(app_id)
        .bind(node_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(CascadeResult { links, configs })
}
