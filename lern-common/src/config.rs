//! Configuration loading and config file resolution
//!
//! Taxonomy prefixes, capability specifications and audit exclusions are
//! domain facts maintained outside the code; they live in the same TOML file
//! as the service settings and are loaded once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "LERN_CONFIG";

/// Complete service configuration (`curriculum.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LernConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub oracle: OracleConfig,
    pub linking: LinkingConfig,
    pub audit: AuditConfig,
    /// App id → curriculum code prefixes the app can be linked against
    pub taxonomy: BTreeMap<String, Vec<String>>,
    /// App id → human-authored description of what the app can and cannot teach
    pub capabilities: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; relative paths resolve against the data directory
    pub path: PathBuf,
    pub max_connections: u32,
    /// Upper bound for waiting on a pooled connection
    pub acquire_timeout_secs: u64,
    /// SQLite busy_timeout applied to every connection
    pub busy_timeout_ms: u64,
    /// Total backoff budget when a write keeps hitting a locked database
    pub max_lock_wait_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir().join("lern.db"),
            max_connections: 10,
            acquire_timeout_secs: 10,
            busy_timeout_ms: 250,
            max_lock_wait_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "lern_curriculum=info,tower_http=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    /// Cap on the characters of each content payload placed in a prompt
    pub summary_chars: usize,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_batches: 4,
            summary_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub default_limit: usize,
    /// Candidates fetched per reviewed item before shuffling
    pub oversample_factor: usize,
    /// Apps whose content is too deterministic to need review
    pub excluded_apps: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_limit: 1,
            oversample_factor: 5,
            excluded_apps: Vec::new(),
        }
    }
}

impl LernConfig {
    /// Taxonomy prefixes registered for an app
    pub fn taxonomy_prefixes(&self, app_id: &str) -> Option<&[String]> {
        self.taxonomy
            .get(app_id)
            .map(|p| p.as_slice())
            .filter(|p| !p.is_empty())
    }

    /// Capability specification registered for an app
    pub fn capability_spec(&self, app_id: &str) -> Option<&str> {
        self.capabilities
            .get(app_id)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Reject values that would make the pipelines misbehave
    pub fn validate(&self) -> Result<()> {
        if self.linking.batch_size == 0 {
            return Err(Error::Config("linking.batch_size must be at least 1".to_string()));
        }
        if self.linking.max_concurrent_batches == 0 {
            return Err(Error::Config(
                "linking.max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        if self.audit.oversample_factor == 0 {
            return Err(Error::Config("audit.oversample_factor must be at least 1".to_string()));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(Error::Config("oracle.timeout_secs must be at least 1".to_string()));
        }
        for (app, prefixes) in &self.taxonomy {
            if prefixes.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::Config(format!("taxonomy.{} contains an empty prefix", app)));
            }
        }
        Ok(())
    }
}

/// Config file resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. User config dir (`~/.config/lern/curriculum.toml`), then `/etc/lern/curriculum.toml`
///
/// Returns `None` when no file is found; built-in defaults apply then.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("lern").join("curriculum.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/lern/curriculum.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load configuration from an optional TOML file
///
/// An explicitly named file that does not exist is an error; no file at all
/// yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<LernConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            let config: LernConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
            info!(
                path = %path.display(),
                apps_with_taxonomy = config.taxonomy.len(),
                apps_with_capabilities = config.capabilities.len(),
                "Loaded configuration"
            );
            config
        }
        None => {
            debug!("No config file found, using built-in defaults");
            LernConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

/// Write configuration back to disk (temp file + rename)
pub fn write_toml_config(config: &LernConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lern"))
        .unwrap_or_else(|| PathBuf::from("./lern_data"))
}
