use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory holding config.toml and the default database
    #[serde(skip)]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub extension: ExtensionConfig,
}

impl Config {
    /// Effective database URL: explicit setting, else `lextro.db` in the data dir.
    pub fn database_url(&self) -> String {
        self.database.url.clone().unwrap_or_else(|| {
            format!("sqlite://{}", self.data_dir.join("lextro.db").display())
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extension.validate()?;
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        for session in &self.identity.sessions {
            if session.token.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "identity session for {} has an empty token",
                    session.external_id
                )));
            }
        }
        Ok(())
    }
}

// ── Backend server ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host (default: 127.0.0.1)
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port (default: 3000)
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Origins allowed to call the API cross-origin (extension origins)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}

fn default_server_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cors_origins: Vec::new(),
        }
    }
}

// ── Persistence ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// sqlx connection URL; defaults to `<data_dir>/lextro.db`
    #[serde(default)]
    pub url: Option<String>,
}

// ── Explanation generation ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_temperature")]
    pub temperature: f64,
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_generation_temperature() -> f64 {
    0.7
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_generation_timeout_secs() -> u64 {
    90
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_generation_model(),
            temperature: default_generation_temperature(),
            base_url: default_generation_base_url(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

// ── Identity ──────────────────────────────────────────────────────

/// Session tokens issued by the identity provider, mapped to the identity
/// they stand for.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub external_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
}

// ── Extension runtime ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Backend the extension talks to (default: http://localhost:3000)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Auth cache freshness window (default: 300s)
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
    /// Retries after the first failed attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Quiet period that closes a burst of page mutations (default: 500ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long one attempt waits for a reply before counting as missing
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:3000".into()
}

fn default_freshness_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    8000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_reply_timeout_ms() -> u64 {
    5000
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            freshness_secs: default_freshness_secs(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            debounce_ms: default_debounce_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl ExtensionConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.freshness_secs == 0 {
            return Err(ConfigError::Validation(
                "extension.freshness_secs must be greater than 0".into(),
            ));
        }
        if self.base_backoff_ms == 0 {
            return Err(ConfigError::Validation(
                "extension.base_backoff_ms must be greater than 0".into(),
            ));
        }
        if self.max_backoff_ms < self.base_backoff_ms {
            return Err(ConfigError::Validation(format!(
                "extension.max_backoff_ms ({}) must be >= base_backoff_ms ({})",
                self.max_backoff_ms, self.base_backoff_ms
            )));
        }
        if url::Url::parse(&self.backend_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "extension.backend_url is not a valid URL: {}",
                self.backend_url
            )));
        }
        Ok(())
    }
}
