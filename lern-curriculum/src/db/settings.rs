//! Settings database operations
//!
//! Key-value accessors over the `settings` table. The oracle API key stored
//! here takes precedence over the environment and the TOML file.

use lern_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const ORACLE_API_KEY: &str = "oracle_api_key";

/// Oracle API key stored via the settings endpoint
pub async fn get_oracle_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, ORACLE_API_KEY).await
}

pub async fn set_oracle_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, ORACLE_API_KEY, key).await
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
