//! Database initialization
//!
//! Opens the SQLite pool with bounded acquire/busy timeouts and creates the
//! tables the curriculum subsystem reads and writes. Referential integrity
//! between links, contents and nodes is not declared: content
//! and curriculum rows are owned by other tooling and may disappear under
//! existing links.

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !config.path.exists();

    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", config.path.display());
    } else {
        info!("Opened existing database: {}", config.path.display());
    }

    create_schema(&pool).await?;

    info!(
        busy_timeout_ms = config.busy_timeout_ms,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Database ready"
    );

    Ok(pool)
}

/// Single-connection in-memory pool with the full schema
///
/// One connection only: every SQLite `:memory:` connection is a separate
/// database.
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_settings_table(pool).await?;
    create_curriculum_nodes_table(pool).await?;
    create_contents_table(pool).await?;
    create_content_curriculum_table(pool).await?;
    create_app_curriculum_config_table(pool).await?;
    create_user_mastery_table(pool).await?;
    create_feedback_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_curriculum_nodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS curriculum_nodes (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            level TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_curriculum_nodes_level ON curriculum_nodes(level, code)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_contents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contents (
            id INTEGER PRIMARY KEY,
            app_id TEXT NOT NULL,
            data TEXT NOT NULL,
            ai_generated INTEGER NOT NULL DEFAULT 0,
            human_verified INTEGER NOT NULL DEFAULT 0,
            ai_reviewed_counter INTEGER NOT NULL DEFAULT 0 CHECK (ai_reviewed_counter >= 0),
            flag_counter INTEGER NOT NULL DEFAULT 0 CHECK (flag_counter >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contents_app ON contents(app_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contents_review_queue
         ON contents(ai_generated, human_verified, ai_reviewed_counter, flag_counter)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_curriculum_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_curriculum (
            content_id INTEGER NOT NULL,
            curriculum_node_id INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (content_id, curriculum_node_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_curriculum_node ON content_curriculum(curriculum_node_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_app_curriculum_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_curriculum_config (
            app_id TEXT NOT NULL,
            curriculum_node_id INTEGER NOT NULL,
            settings TEXT NOT NULL DEFAULT '{}',
            PRIMARY KEY (app_id, curriculum_node_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_mastery_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_mastery (
            user_id TEXT NOT NULL,
            curriculum_node_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('started', 'completed')),
            mastery_level INTEGER NOT NULL CHECK (mastery_level BETWEEN 0 AND 100),
            last_activity TEXT NOT NULL,
            PRIMARY KEY (user_id, curriculum_node_id),
            CHECK ((status = 'completed') = (mastery_level = 100))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_feedback_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            comment TEXT NOT NULL,
            error_type TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
