use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::orchestrator::RetryPolicy;
use crate::safety::fabrication::Containment;
use crate::safety::sanitize::DEFAULT_MAX_INPUT_CHARS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub generation_timeout_secs: u64,
    pub generation_max_retries: u32,
    pub generation_backoff_base_ms: u64,
    pub max_input_chars: usize,
    pub fabrication_match: Containment,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            generation_timeout_secs: env_or("GENERATION_TIMEOUT_SECS", 30)?,
            generation_max_retries: env_or("GENERATION_MAX_RETRIES", 2)?,
            generation_backoff_base_ms: env_or("GENERATION_BACKOFF_BASE_MS", 1000)?,
            max_input_chars: env_or("MAX_INPUT_CHARS", DEFAULT_MAX_INPUT_CHARS)?,
            fabrication_match: env_or("FABRICATION_MATCH", Containment::default())?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.generation_timeout_secs),
            max_retries: self.generation_max_retries,
            backoff_base: Duration::from_millis(self.generation_backoff_base_ms),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{value}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_uses_default() {
        assert_eq!(parse_or::<u16>("PORT", None, 8080).unwrap(), 8080);
    }

    #[test]
    fn test_present_value_is_parsed() {
        assert_eq!(parse_or::<u32>("N", Some(" 5 ".to_string()), 2).unwrap(), 5);
        assert_eq!(
            parse_or("FABRICATION_MATCH", Some("bidirectional".to_string()), Containment::default())
                .unwrap(),
            Containment::Bidirectional
        );
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = parse_or::<u64>("GENERATION_TIMEOUT_SECS", Some("soon".to_string()), 30)
            .unwrap_err();
        assert!(err.to_string().contains("GENERATION_TIMEOUT_SECS"));
    }

    #[test]
    fn test_retry_policy_uses_configured_values() {
        let config = Config {
            anthropic_api_key: "test".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
            generation_timeout_secs: 10,
            generation_max_retries: 4,
            generation_backoff_base_ms: 250,
            max_input_chars: 100,
            fabrication_match: Containment::default(),
        };
        let policy = config.retry_policy();
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.backoff(3), Duration::from_secs(1));
    }
}
