use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    /// Base URL of the embedding service. Unset means no candidate is indexed.
    pub embedding_service_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub screening: ScreeningConfig,
}

/// Knobs for the session coordinator and its external calls.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Worker pool size; keeps LLM and embedding calls under rate limits.
    pub max_concurrency: usize,
    pub external_call_timeout: Duration,
    pub external_call_max_attempts: u32,
    pub token_cost_usd: f64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            external_call_timeout: Duration::from_secs(60),
            external_call_max_attempts: 3,
            token_cost_usd: 0.000005,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ScreeningConfig::default();

        let max_concurrency: usize =
            optional_env("SCREENING_MAX_CONCURRENCY", defaults.max_concurrency)?;
        if max_concurrency == 0 {
            anyhow::bail!("SCREENING_MAX_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            screening: ScreeningConfig {
                max_concurrency,
                external_call_timeout: Duration::from_secs(optional_env(
                    "EXTERNAL_CALL_TIMEOUT_SECS",
                    defaults.external_call_timeout.as_secs(),
                )?),
                external_call_max_attempts: optional_env(
                    "EXTERNAL_CALL_MAX_ATTEMPTS",
                    defaults.external_call_max_attempts,
                )?
                .max(1),
                token_cost_usd: optional_env("TOKEN_COST_USD", defaults.token_cost_usd)?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_optional(key, std::env::var(key).ok(), default)
}

fn parse_optional<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {value}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_uses_default_when_unset() {
        let port: u16 = parse_optional("PORT", None, 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_optional_ignores_blank() {
        let n: usize = parse_optional("SCREENING_MAX_CONCURRENCY", Some("  ".into()), 4).unwrap();
        assert_eq!(n, 4);
    }

    #[test]
    fn test_parse_optional_parses_value() {
        let cost: f64 = parse_optional("TOKEN_COST_USD", Some("0.00001".into()), 0.0).unwrap();
        assert!((cost - 0.00001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_optional_rejects_garbage() {
        let result: Result<u16> = parse_optional("PORT", Some("eighty".into()), 8080);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("PORT"), "unexpected error: {err}");
    }

    #[test]
    fn test_screening_defaults() {
        let cfg = ScreeningConfig::default();
        assert_eq!(cfg.max_concurrency, 4);
        assert_eq!(cfg.external_call_max_attempts, 3);
        assert_eq!(cfg.external_call_timeout, Duration::from_secs(60));
    }
}
