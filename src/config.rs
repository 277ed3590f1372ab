//! Centralized configuration management for ledgerdesk

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the back-office API, e.g. `https://host/api/v1`
    pub api_url: String,
    /// File the session token is persisted to between CLI runs
    pub token_file: PathBuf,
    /// Directory exports are materialized into
    pub download_dir: PathBuf,
    /// List controller tuning
    pub list: ListConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// List controller configuration
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Quiet period before a search keystroke turns into a fetch (milliseconds)
    pub search_debounce_ms: u64,
    /// Default page size
    pub page_size: u32,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 500,
            page_size: 10,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "ledgerdesk/0.1.0".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/v1".to_string(),
            token_file: PathBuf::from("./.ledgerdesk-token"),
            download_dir: PathBuf::from("./downloads"),
            list: ListConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let api_url = std::env::var("LEDGERDESK_API_URL")
            .unwrap_or(defaults.api_url)
            .trim_end_matches('/')
            .to_string();

        let token_file = std::env::var("LEDGERDESK_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_file);

        let download_dir = std::env::var("LEDGERDESK_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);

        let list = ListConfig {
            search_debounce_ms: parse_env_var("LEDGERDESK_SEARCH_DEBOUNCE_MS")?
                .unwrap_or(defaults.list.search_debounce_ms),
            page_size: parse_env_var("LEDGERDESK_PAGE_SIZE")?.unwrap_or(defaults.list.page_size),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("LEDGERDESK_HTTP_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.http.timeout_seconds),
            user_agent: std::env::var("LEDGERDESK_USER_AGENT").unwrap_or(defaults.http.user_agent),
        };

        Ok(Config {
            api_url,
            token_file,
            download_dir,
            list,
            http,
        })
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Get search debounce as Duration
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.list.search_debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "API URL must start with http:// or https://: {}",
                self.api_url
            ));
        }

        if self.list.page_size == 0 {
            return Err(anyhow::anyhow!("Page size must be greater than zero"));
        }

        std::fs::create_dir_all(&self.download_dir).with_context(|| {
            format!(
                "Cannot create download directory: {}",
                self.download_dir.display()
            )
        })?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000/api/v1");
        assert_eq!(config.list.search_debounce_ms, 500);
        assert_eq!(config.list.page_size, 10);
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_validation() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            download_dir: temp_dir.path().join("exports"),
            ..Config::default()
        };
        config.validate().unwrap();
        assert!(temp_dir.path().join("exports").exists());
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let config = Config {
            api_url: "localhost:8000".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_var_reports_bad_values() {
        std::env::set_var("LEDGERDESK_TEST_BAD_NUMBER", "ten");
        let parsed: Result<Option<u32>> = parse_env_var("LEDGERDESK_TEST_BAD_NUMBER");
        assert!(parsed.is_err());

        let missing: Option<u32> = parse_env_var("LEDGERDESK_TEST_UNSET_NUMBER").unwrap();
        assert!(missing.is_none());
    }
}
