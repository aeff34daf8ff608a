//! TOML configuration loaded at startup.
//!
//! One file holds everything: warehouse coordinates, provider settings, the
//! session database location, and query safety limits. Credentials stay in
//! the file (or environment) rather than being prompted for; this is an
//! operator tool.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub warehouse: WarehouseConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    pub project_id: String,
    pub dataset: String,
    pub table: String,
    /// OAuth bearer token for the warehouse API. Falls back to the
    /// `WAREHOUSE_ACCESS_TOKEN` environment variable when absent.
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Falls back to the `PROVIDER_API_KEY` environment variable when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Overrides the default per-user data directory location.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_max_date_range_days")]
    pub max_date_range_days: i64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_date_range_days: default_max_date_range_days(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_date_range_days() -> i64 {
    30
}

fn default_query_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Loads configuration from an explicit path, or from the default
    /// location under the platform config directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("PROVIDER_API_KEY").ok();
        }
        if config.warehouse.access_token.is_none() {
            config.warehouse.access_token = std::env::var("WAREHOUSE_ACCESS_TOKEN").ok();
        }
        Ok(config)
    }

    /// Resolved session database path: explicit override, or
    /// `sessions.db` under the platform data directory.
    pub fn session_db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session.db_path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "bichat")
            .context("Could not determine a data directory for this platform")?;
        Ok(dirs.data_dir().join("sessions.db"))
    }
}

/// `config.toml` under the platform config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "bichat")
        .context("Could not determine a config directory for this platform")?;
    Ok(dirs.config_dir().join(CONFIG_FILENAME))
}
