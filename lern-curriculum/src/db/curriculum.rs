//! Curriculum node queries (read-only reference data)

use crate::models::{CurriculumNode, NodeLevel};
use lern_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn row_to_node(row: &SqliteRow) -> Result<CurriculumNode> {
    let level: String = row.try_get("level")?;
    Ok(CurriculumNode {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        level: level.parse::<NodeLevel>().map_err(Error::Internal)?,
    })
}

/// Leaf (`competency_stage`) nodes whose code starts with any prefix
///
/// Prefix comparison uses `substr`, so `_` and `%` in codes carry no
/// pattern meaning.
pub async fn load_leaf_nodes_by_prefixes(pool: &SqlitePool, prefixes: &[String]) -> Result<Vec<CurriculumNode>> {
    if prefixes.is_empty() {
        return Ok(Vec::new());
    }

    let prefix_clause = prefixes
        .iter()
        .map(|_| "substr(code, 1, length(?)) = ?")
        .collect::<Vec<_>>()
        .join(" OR ");

    let sql = format!(
        "SELECT id, code, title, description, level
         FROM curriculum_nodes
         WHERE level = ? AND ({})
         ORDER BY code",
        prefix_clause
    );

    let mut query = sqlx::query(&sql).bind(NodeLevel::CompetencyStage.as_str());
    for prefix in prefixes {
        query = query.bind(prefix).bind(prefix);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_node).collect()
}

/// Load a node by id
pub async fn load_node(pool: &SqlitePool, id: i64) -> Result<Option<CurriculumNode>> {
    let row = sqlx::query("SELECT id, code, title, description, level FROM curriculum_nodes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_node).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lern_common::db::init_in_memory_database;

    async fn seed(pool: &SqlitePool) {
        sqlx::query(
            "INSERT INTO curriculum_nodes (id, code, title, description, level) VALUES
             (1, 'MA', 'Mathematik', '', 'subject'),
             (2, 'MA.1.A', 'Zahlen und Operationen', '', 'competency_area'),
             (279, 'MA.1.A.3.a', 'Addieren bis 10', 'Einfache Additionen', 'competency_stage'),
             (280, 'MA.1.A.3.b', 'Subtrahieren bis 10', '', 'competency_stage'),
             (300, 'MA.2.B.1.a', 'Flaechen', '', 'competency_stage'),
             (400, 'MA_1.A.9.z', 'Wildcard trap', '', 'competency_stage')",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_only_leaf_nodes_under_prefix() {
        let pool = init_in_memory_database().await.unwrap();
        seed(&pool).await;

        let nodes = load_leaf_nodes_by_prefixes(&pool, &["MA.1.A".to_string()]).await.unwrap();
        let ids: Vec<i64> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![279, 280]);
        assert!(nodes.iter().all(|n| n.level == NodeLevel::CompetencyStage));
    }

    #[tokio::test]
    async fn test_multiple_prefixes_and_no_match() {
        let pool = init_in_memory_database().await.unwrap();
        seed(&pool).await;

        let nodes = load_leaf_nodes_by_prefixes(&pool, &["MA.2".to_string(), "MA.1.A.3.b".to_string()])
            .await
            .unwrap();
        assert_eq!(nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![280, 300]);

        let none = load_leaf_nodes_by_prefixes(&pool, &["DE".to_string()]).await.unwrap();
        assert!(none.is_empty());
        assert!(load_leaf_nodes_by_prefixes(&pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_node() {
        let pool = init_in_memory_database().await.unwrap();
        seed(&pool).await;

        let node = load_node(&pool, 279).await.unwrap().unwrap();
        assert_eq!(node.code, "MA.1.A.3.a");
        assert!(load_node(&pool, 9999).await.unwrap().is_none());
    }
}
