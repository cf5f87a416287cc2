use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_MARGIN_PERCENT: f64 = 40.0;
const DEFAULT_MIN_SEARCH_VOLUME: i64 = 1000;
const DEFAULT_GROQ_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_GROQ_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Settings for the content-generation LLM calls.
#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    /// Groq API key. Content generation is unavailable without it.
    #[serde(default)]
    pub groq_api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Fixed delay before each generation call, to stay under the provider's
    /// per-minute request limit.
    #[serde(default = "default_precall_delay")]
    pub precall_delay_secs: u64,

    /// Base backoff applied on rate-limit retries (15s, 30s, 45s).
    #[serde(default = "default_backoff_step")]
    pub backoff_step_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            chat_model: default_chat_model(),
            vision_model: default_vision_model(),
            precall_delay_secs: default_precall_delay(),
            backoff_step_secs: default_backoff_step(),
            max_retries: default_max_retries(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development", "production", "test")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Margin applied on top of final cost for the suggested retail price.
    #[serde(default = "default_margin_percent")]
    pub default_margin_percent: f64,

    /// Minimum monthly search volume for keyword ranking.
    #[serde(default = "default_min_search_volume")]
    pub min_search_volume: i64,

    #[serde(default)]
    pub db_max_connections: Option<u32>,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_margin_percent() -> f64 {
    DEFAULT_MARGIN_PERCENT
}
fn default_min_search_volume() -> i64 {
    DEFAULT_MIN_SEARCH_VOLUME
}
fn default_chat_model() -> String {
    DEFAULT_GROQ_CHAT_MODEL.to_string()
}
fn default_vision_model() -> String {
    DEFAULT_GROQ_VISION_MODEL.to_string()
}
fn default_precall_delay() -> u64 {
    10
}
fn default_backoff_step() -> u64 {
    15
}
fn default_max_retries() -> u32 {
    3
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            host: default_host(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            default_margin_percent: default_margin_percent(),
            min_search_volume: default_min_search_volume(),
            db_max_connections: None,
            llm: LlmConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Loads configuration from layered files plus an `APP_` environment overlay.
///
/// Order of precedence (lowest to highest): `config/default.toml`, the
/// environment-specific file (`config/{RUN_ENV}.toml`), then environment
/// variables prefixed with `APP_` (e.g. `APP_DATABASE_URL`,
/// `APP_LLM__GROQ_API_KEY`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_path = Path::new(CONFIG_DIR).join("default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }
    let env_path = Path::new(CONFIG_DIR).join(format!("{run_env}.toml"));
    if env_path.exists() {
        builder = builder.add_source(File::from(env_path));
    }

    builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.default_margin_percent, 40.0);
        assert_eq!(cfg.min_search_volume, 1000);
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_llm_defaults() {
        let llm = LlmConfig::default();
        assert_eq!(llm.max_retries, 3);
        assert_eq!(llm.backoff_step_secs, 15);
        assert_eq!(llm.precall_delay_secs, 10);
        assert!(llm.groq_api_key.is_none());
    }
}
