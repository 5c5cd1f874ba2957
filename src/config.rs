use std::time::Duration;

use thiserror::Error;

use crate::transport::{RetryPolicy, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, MAX_BATCH_SIZE};

pub const ORGANIZATION_URL: &str = "ORGANIZATION_URL";
pub const PERSONAL_ACCESS_TOKEN: &str = "PERSONAL_ACCESS_TOKEN";
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const RETRY_ATTEMPTS: &str = "EXTRACT_RETRY_ATTEMPTS";
pub const RETRY_DELAY_SECS: &str = "EXTRACT_RETRY_DELAY_SECS";
pub const RETRY_BACKOFF: &str = "EXTRACT_RETRY_BACKOFF";
pub const BATCH_SIZE: &str = "EXTRACT_BATCH_SIZE";
pub const HTTP_TIMEOUT_SECS: &str = "EXTRACT_HTTP_TIMEOUT_SECS";

const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection and tuning settings for one extraction run.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// e.g. `https://dev.azure.com/my-org`, without a trailing slash.
    pub organization_url: String,
    pub personal_access_token: String,
    /// Optional here; the command line may name the project instead.
    pub project_name: Option<String>,
    pub retry: RetryPolicy,
    /// Ids per work-item batch call, `1..=200`.
    pub batch_size: usize,
    pub http_timeout: Duration,
}

impl AzureConfig {
    /// Load from the process environment, after reading an optional `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any name → value lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let organization_url = get(ORGANIZATION_URL)
            .ok_or(ConfigError::Missing(ORGANIZATION_URL))?
            .trim_end_matches('/')
            .to_string();
        if !organization_url.starts_with("http://") && !organization_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: ORGANIZATION_URL,
                value: organization_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }
        let personal_access_token = get(PERSONAL_ACCESS_TOKEN).ok_or(ConfigError::Missing(PERSONAL_ACCESS_TOKEN))?;

        let max_attempts: u32 = parse_or(get(RETRY_ATTEMPTS), RETRY_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(invalid(RETRY_ATTEMPTS, "0", "at least one attempt is required"));
        }
        let delay_secs: u64 = parse_or(get(RETRY_DELAY_SECS), RETRY_DELAY_SECS, DEFAULT_RETRY_DELAY_SECS)?;
        let backoff: f64 = parse_or(get(RETRY_BACKOFF), RETRY_BACKOFF, DEFAULT_BACKOFF)?;
        if !backoff.is_finite() || backoff < 1.0 {
            return Err(invalid(RETRY_BACKOFF, &backoff.to_string(), "must be a number >= 1.0"));
        }

        let batch_size: usize = parse_or(get(BATCH_SIZE), BATCH_SIZE, MAX_BATCH_SIZE)?;
        let timeout_secs: u64 = parse_or(get(HTTP_TIMEOUT_SECS), HTTP_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            organization_url,
            personal_access_token,
            project_name: get(PROJECT_NAME),
            retry: RetryPolicy::new(max_attempts, Duration::from_secs(delay_secs), backoff),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The project to extract: the explicit one if given, else the configured one.
    pub fn project(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        explicit
            .map(str::to_string)
            .or_else(|| self.project_name.clone())
            .ok_or(ConfigError::Missing(PROJECT_NAME))
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| invalid(name, &value, &e.to_string())),
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AzureConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AzureConfig::from_lookup(|name| map.get(name).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        (ORGANIZATION_URL, "https://dev.azure.com/org/"),
        (PERSONAL_ACCESS_TOKEN, "secret"),
    ];

    #[test]
    fn applies_defaults() {
        let config = load(BASE).unwrap();
        assert_eq!(config.organization_url, "https://dev.azure.com/org");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert_eq!(config.project_name, None);
    }

    #[test]
    fn requires_token() {
        let err = load(&[(ORGANIZATION_URL, "https://dev.azure.com/org")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(PERSONAL_ACCESS_TOKEN));
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut vars = BASE.to_vec();
        vars.push((RETRY_ATTEMPTS, "three"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: RETRY_ATTEMPTS, .. })));

        let mut vars = BASE.to_vec();
        vars.push((RETRY_BACKOFF, "0.5"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: RETRY_BACKOFF, .. })));
    }

    #[test]
    fn clamps_batch_size() {
        let mut vars = BASE.to_vec();
        vars.push((BATCH_SIZE, "500"));
        assert_eq!(load(&vars).unwrap().batch_size, 200);
    }

    #[test]
    fn explicit_project_wins() {
        let mut vars = BASE.to_vec();
        vars.push((PROJECT_NAME, "Configured"));
        let config = load(&vars).unwrap();
        assert_eq!(config.project(Some("Cli")).unwrap(), "Cli");
        assert_eq!(config.project(None).unwrap(), "Configured");
    }
}
