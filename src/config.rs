use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::QuoteError;

/// Settings read from the optional TOML config file.
///
/// Credentials and table identifiers never live here; they come from the
/// environment (see [`Config::load`]).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Feishu open-API origin. Overridable for self-hosted deployments and
    /// tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join("feishu").join("classic-quotes.json")
}

fn default_base_url() -> String {
    "https://open.feishu.cn".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feishu application id (`FEISHU_APP_ID`).
    pub app_id: String,
    /// Feishu application secret (`FEISHU_APP_SECRET`).
    pub app_secret: String,
    /// Bitable base token (`FEISHU_BASE_TOKEN`).
    pub base_token: String,
    /// Table id within the base (`FEISHU_TABLE_ID`).
    pub table_id: String,
    /// Optional view id (`FEISHU_VIEW_ID`).
    pub view_id: Option<String>,
    /// Cache freshness window in minutes (`FEISHU_CACHE_TTL_MINUTES`, default 30).
    pub ttl_minutes: u64,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load the TOML file (defaults apply when it does not exist) and the
    /// Feishu credentials from the environment.
    ///
    /// Fails with [`QuoteError::Config`] when a required variable is missing
    /// or empty, the TTL is not a positive integer, or the file is malformed.
    pub fn load(path: &Path) -> Result<Self, QuoteError> {
        let file = load_file_config(path)?;

        let config = Self {
            app_id: require_env("FEISHU_APP_ID")?,
            app_secret: require_env("FEISHU_APP_SECRET")?,
            base_token: require_env("FEISHU_BASE_TOKEN")?,
            table_id: require_env("FEISHU_TABLE_ID")?,
            view_id: optional_env("FEISHU_VIEW_ID"),
            ttl_minutes: parse_ttl(optional_env("FEISHU_CACHE_TTL_MINUTES"))?,
            server: file.server,
            cache: file.cache,
            upstream: file.upstream,
        };

        if config.upstream.timeout_secs == 0 {
            return Err(QuoteError::Config(
                "upstream.timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(config)
    }

    /// The freshness window as a duration.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes as i64)
    }
}

/// Parse the TOML config file. A missing file yields the defaults; a
/// malformed one is an error.
pub fn load_file_config(path: &Path) -> Result<FileConfig, QuoteError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        QuoteError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        QuoteError::Config(format!("failed to parse config file {}: {}", path.display(), e))
    })
}

fn require_env(key: &str) -> Result<String, QuoteError> {
    optional_env(key).ok_or_else(|| QuoteError::Config(format!("{} is not set", key)))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_ttl(raw: Option<String>) -> Result<u64, QuoteError> {
    let Some(raw) = raw else {
        return Ok(30);
    };
    match raw.parse::<u64>() {
        Ok(minutes) if minutes >= 1 => Ok(minutes),
        _ => Err(QuoteError::Config(format!(
            "FEISHU_CACHE_TTL_MINUTES must be a positive integer, got '{}'",
            raw
        ))),
    }
}
