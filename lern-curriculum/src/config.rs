//! Oracle credential resolution and write-back
//!
//! Priority: Database → ENV → TOML. A key set through the settings endpoint
//! is authoritative; the environment and the config file are fallbacks.

use lern_common::config::{load_config, write_toml_config, OracleConfig};
use lern_common::Result;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable carrying the oracle API key
pub const ORACLE_API_KEY_ENV: &str = "LERN_ORACLE_API_KEY";

/// Resolve the oracle API key from the three sources
///
/// `None` is not an error: self-hosted OpenAI-compatible endpoints usually
/// run without a key.
pub async fn resolve_oracle_api_key(db: &Pool<Sqlite>, oracle_config: &OracleConfig) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_oracle_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(ORACLE_API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = oracle_config.api_key.clone().filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Oracle API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Oracle API key loaded from database");
        return Ok(Some(key));
    }
    if let Some(key) = env_key {
        info!("Oracle API key loaded from environment variable");
        return Ok(Some(key));
    }
    if let Some(key) = toml_key {
        info!("Oracle API key loaded from TOML config");
        return Ok(Some(key));
    }

    warn!(
        "No oracle API key configured (settings endpoint, {} or oracle.api_key); requests go out unauthenticated",
        ORACLE_API_KEY_ENV
    );
    Ok(None)
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Copy the key into the TOML file as a backup of the database value
///
/// Other settings in the file are preserved.
pub fn sync_api_key_to_toml(key: &str, toml_path: &Path) -> Result<()> {
    let mut config = if toml_path.exists() {
        load_config(Some(toml_path))?
    } else {
        Default::default()
    };

    config.oracle.api_key = Some(key.to_string());
    write_toml_config(&config, toml_path)?;

    info!("Oracle API key synced to TOML: {}", toml_path.display());
    Ok(())
}
