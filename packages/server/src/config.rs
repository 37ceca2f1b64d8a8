use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::refresh::RefreshSettings;
use crate::kernel::BackoffConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub tavily_api_key: Option<String>,
    /// Bearer token required by `POST /internal/refresh` when set
    pub refresh_trigger_token: Option<String>,
    pub refresh_cooldown_secs: u64,
    pub refresh_batch_limit: usize,
    pub refresh_cycle_timeout_secs: u64,
    /// Cron expression for the in-process refresh cycle; `None` disables it
    pub refresh_cron: Option<String>,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 8080)?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            refresh_trigger_token: non_empty("REFRESH_TRIGGER_TOKEN"),
            refresh_cooldown_secs: parse_or("REFRESH_COOLDOWN_SECS", 3600)?,
            refresh_batch_limit: parse_or("REFRESH_BATCH_LIMIT", 10)?,
            refresh_cycle_timeout_secs: parse_or("REFRESH_CYCLE_TIMEOUT_SECS", 300)?,
            refresh_cron: match env::var("REFRESH_CRON") {
                Ok(expr) if expr.trim().is_empty() => None,
                Ok(expr) => Some(expr),
                Err(_) => Some("0 */15 * * * *".to_string()),
            },
            retry_max_attempts: parse_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", 1000)?,
        })
    }

    /// The knobs the refresh pipeline itself consumes.
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            cooldown: Duration::from_secs(self.refresh_cooldown_secs),
            batch_limit: self.refresh_batch_limit,
            cycle_timeout: Duration::from_secs(self.refresh_cycle_timeout_secs),
            backoff: BackoffConfig::builder()
                .max_attempts(self.retry_max_attempts)
                .base_delay(Duration::from_millis(self.retry_base_delay_ms))
                .build(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
