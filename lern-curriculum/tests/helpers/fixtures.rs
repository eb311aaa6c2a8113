//! Database and configuration fixtures

use lern_common::config::{DatabaseConfig, LernConfig};
use sqlx::SqlitePool;
use std::path::Path;

/// In-memory database with the full schema
pub async fn create_test_db() -> SqlitePool {
    lern_common::db::init_in_memory_database()
        .await
        .expect("Failed to create in-memory database")
}

/// File-backed WAL database with a multi-connection pool, so concurrent
/// writers really contend for the lock
pub async fn create_file_db(dir: &Path) -> SqlitePool {
    let config = DatabaseConfig {
        path: dir.join("lern.db"),
        max_connections: 8,
        busy_timeout_ms: 5000,
        ..DatabaseConfig::default()
    };
    lern_common::db::init_database(&config)
        .await
        .expect("Failed to create file database")
}

/// Config with one mapped app (`kopfrechnen` → `MA.1.A`) and capability specs
/// for `kopfrechnen` and `uhr`
pub fn test_config() -> LernConfig {
    toml::from_str(
        r#"
        [taxonomy]
        kopfrechnen = ["MA.1.A"]
        geometrie = ["MA.9"]

        [capabilities]
        kopfrechnen = "Mental arithmetic drills: addition and subtraction up to 100. No geometry, no clocks."
        uhr = "Reading analog clocks to the quarter hour."

        [audit]
        excluded_apps = ["uhr"]

        [database]
        max_lock_wait_ms = 1000
        "#,
    )
    .expect("Failed to parse test config")
}

pub async fn seed_node(pool: &SqlitePool, id: i64, code: &str, title: &str, level: &str) {
    sqlx::query("INSERT INTO curriculum_nodes (id, code, title, description, level) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(code)
        .bind(title)
        .bind(format!("{} (Beschreibung)", title))
        .bind(level)
        .execute(pool)
        .await
        .expect("Failed to seed node");
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_content(
    pool: &SqlitePool,
    id: i64,
    app_id: &str,
    data: serde_json::Value,
    ai_generated: bool,
    human_verified: bool,
    reviewed: i64,
    flags: i64,
) {
    sqlx::query(
        "INSERT INTO contents (id, app_id, data, ai_generated, human_verified, ai_reviewed_counter, flag_counter)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(app_id)
    .bind(data.to_string())
    .bind(ai_generated as i64)
    .bind(human_verified as i64)
    .bind(reviewed)
    .bind(flags)
    .execute(pool)
    .await
    .expect("Failed to seed content");
}

pub async fn seed_link(pool: &SqlitePool, content_id: i64, node_id: i64) {
    sqlx::query("INSERT INTO content_curriculum (content_id, curriculum_node_id) VALUES (?, ?)")
        .bind(content_id)
        .bind(node_id)
        .execute(pool)
        .await
        .expect("Failed to seed link");
}

pub async fn seed_app_config(pool: &SqlitePool, app_id: &str, node_id: i64) {
    sqlx::query("INSERT INTO app_curriculum_config (app_id, curriculum_node_id) VALUES (?, ?)")
        .bind(app_id)
        .bind(node_id)
        .execute(pool)
        .await
        .expect("Failed to seed app config");
}

pub async fn seed_user(pool: &SqlitePool, id: &str, is_admin: bool) {
    sqlx::query("INSERT INTO users (id, is_admin) VALUES (?, ?)")
        .bind(id)
        .bind(is_admin as i64)
        .execute(pool)
        .await
        .expect("Failed to seed user");
}

/// Single-value `SELECT COUNT(*) ...`
pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.expect("Count query failed")
}
