use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub github_api_base: String,
    pub github_token: Option<String>,
    /// Bound on every call to the source-control host.
    pub upstream_timeout: Duration,
    /// Whether review submissions are fanned out to the PR room in addition
    /// to comment events.
    pub broadcast_reviews: bool,
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.is_empty())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::MissingVar(var))
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value }),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:data/review-gate.db?mode=rwc".to_string()),
            host: optional("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT", 3310)?,
            jwt_secret: required("JWT_SECRET")?,
            github_api_base: optional("GITHUB_API_BASE")
                .unwrap_or_else(|| "https://api.github.com".to_string()),
            github_token: optional("GITHUB_TOKEN"),
            upstream_timeout: Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS", 30)?),
            broadcast_reviews: parsed("BROADCAST_REVIEWS", false)?,
        })
    }
}
