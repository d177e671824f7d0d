//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `VIVIAS_API_URL` - Backend base URL (default: <http://127.0.0.1:3000>)
//! - `VIVIAS_STORAGE_PATH` - Session storage file (default: vivias-session.json)
//! - `VIVIAS_HTTP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_STORAGE_PATH: &str = "vivias-session.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL
    pub api_url: Url,
    /// JSON file holding the session token and sync timestamps
    pub storage_path: PathBuf,
    /// Timeout applied to each backend request
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url: Url = parse_value(
            "VIVIAS_API_URL",
            get("VIVIAS_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VIVIAS_API_URL".to_string(),
                format!("unsupported scheme {}", api_url.scheme()),
            ));
        }

        let storage_path = get("VIVIAS_STORAGE_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);

        let timeout_secs = get("VIVIAS_HTTP_TIMEOUT_SECS").map_or(
            Ok(DEFAULT_HTTP_TIMEOUT_SECS),
            |raw| parse_value("VIVIAS_HTTP_TIMEOUT_SECS", &raw),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VIVIAS_HTTP_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            storage_path,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(config.storage_path, PathBuf::from("vivias-session.json"));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("VIVIAS_API_URL", "https://api.vivias.id/v1"),
            ("VIVIAS_STORAGE_PATH", "/tmp/vivias.json"),
            ("VIVIAS_HTTP_TIMEOUT_SECS", " 30 "),
        ])
        .unwrap();

        assert_eq!(config.api_url.host_str(), Some("api.vivias.id"));
        assert_eq!(config.storage_path, PathBuf::from("/tmp/vivias.json"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = load(&[("VIVIAS_HTTP_TIMEOUT_SECS", "")]).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("VIVIAS_API_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "VIVIAS_API_URL"
        ));
        assert!(load(&[("VIVIAS_API_URL", "ftp://files.vivias.id")]).is_err());
        assert!(load(&[("VIVIAS_HTTP_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("VIVIAS_HTTP_TIMEOUT_SECS", "ten")]).is_err());
    }
}
