//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub receive: ReceiveConfig,
    pub slack: SlackConfig,
    pub github: GithubConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Receive stream configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiveConfig {
    /// Messages buffered between a receive task and its consumer
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    32
}

/// Slack Web API backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
    /// Environment variable consulted when no token is passed to connect
    #[serde(default = "default_slack_token_env")]
    pub token_env: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_slack_token_env() -> String {
    "SLACK_TOKEN".to_string()
}

fn default_history_limit() -> u32 {
    5
}

/// GitHub REST backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_user_agent() -> String {
    concat!("mcps/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    30000
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// The file is `config/default.toml` unless `MCPS_CONFIG` names another one.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MCPS_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = Settings::default();
        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default("receive.buffer_size", defaults.receive.buffer_size as i64)?
            .set_default("slack.api_url", defaults.slack.api_url)?
            .set_default("slack.token_env", defaults.slack.token_env)?
            .set_default("slack.history_limit", i64::from(defaults.slack.history_limit))?
            .set_default("slack.timeout_ms", defaults.slack.timeout_ms as i64)?
            .set_default("github.api_url", defaults.github.api_url)?
            .set_default("github.token_env", defaults.github.token_env)?
            .set_default("github.user_agent", defaults.github.user_agent)?
            .set_default("github.timeout_ms", defaults.github.timeout_ms as i64)?
            .add_source(File::from(path.as_ref()).required(false))
            // Override with environment variables (prefixed with MCPS__)
            .add_source(
                Environment::with_prefix("MCPS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain PORT wins, matching common hosting conventions
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }
        if self.receive.buffer_size == 0 {
            return Err(invalid("receive.buffer_size must be at least 1"));
        }
        if self.slack.api_url.is_empty() {
            return Err(invalid("slack.api_url cannot be empty"));
        }
        if self.github.api_url.is_empty() {
            return Err(invalid("github.api_url cannot be empty"));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "Invalid logging format '{}'. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            receive: ReceiveConfig {
                buffer_size: default_buffer_size(),
            },
            slack: SlackConfig {
                api_url: default_slack_api_url(),
                token_env: default_slack_token_env(),
                history_limit: default_history_limit(),
                timeout_ms: default_timeout(),
            },
            github: GithubConfig {
                api_url: default_github_api_url(),
                token_env: default_github_token_env(),
                user_agent: default_user_agent(),
                timeout_ms: default_timeout(),
            },
        }
    }
}
