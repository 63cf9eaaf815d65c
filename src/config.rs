// Runtime configuration
//
// Everything comes from the environment (optionally seeded by a .env file).
// The API key is the only credential and it is OPTIONAL: without it the app
// warns and falls back to the keyless rate source.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::REQUEST_TIMEOUT;
use crate::history::HistoryStrategy;

pub const DEFAULT_API_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";
pub const DEFAULT_OPEN_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest";
pub const DEFAULT_TIMESERIES_URL: &str = "https://api.exchangerate.host/timeseries";

pub const MISSING_KEY_WARNING: &str =
    "API key is missing. Set EXCHANGE_RATE_API_KEY (or add it to .env); using the keyless rate source.";

const APP_DIR: &str = "currency-widget";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub open_rates_url: String,
    pub timeseries_url: String,
    pub history_access_key: Option<String>,
    pub history_strategy: HistoryStrategy,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub request_timeout: Duration,
}

impl Config {
    /// Load `.env` if present, then read the process environment. Runs
    /// before the logger exists, so nothing here logs.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let history_strategy = match get("FX_HISTORY_SOURCE") {
            Some(value) => value
                .parse::<HistoryStrategy>()
                .map_err(|e| anyhow!("Invalid FX_HISTORY_SOURCE: {}", e))?,
            None => HistoryStrategy::Simulated,
        };

        let request_timeout = match get("FX_REQUEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid FX_REQUEST_TIMEOUT_SECS '{}'", value))?;
                Duration::from_secs(secs.max(1))
            }
            None => REQUEST_TIMEOUT,
        };

        let data_dir = match get("FX_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
        };

        let log_file = get("FX_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("currency-widget.log"));

        Ok(Config {
            api_key: get("EXCHANGE_RATE_API_KEY"),
            api_base_url: get("FX_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            open_rates_url: get("FX_OPEN_RATES_URL")
                .unwrap_or_else(|| DEFAULT_OPEN_RATES_URL.to_string()),
            timeseries_url: get("FX_TIMESERIES_URL")
                .unwrap_or_else(|| DEFAULT_TIMESERIES_URL.to_string()),
            history_access_key: get("FX_HISTORY_ACCESS_KEY"),
            history_strategy,
            data_dir,
            log_file,
            request_timeout,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Startup warning to surface, if any
    pub fn warning(&self) -> Option<&'static str> {
        if self.has_api_key() {
            None
        } else {
            Some(MISSING_KEY_WARNING)
        }
    }

    pub fn favorites_db(&self) -> PathBuf {
        self.data_dir.join("favorites.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_key() {
        let config = config_from(&[("FX_DATA_DIR", "/tmp/fx")]).unwrap();

        assert!(!config.has_api_key());
        assert_eq!(config.warning(), Some(MISSING_KEY_WARNING));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.history_strategy, HistoryStrategy::Simulated);
        assert_eq!(config.request_timeout, REQUEST_TIMEOUT);
        assert_eq!(config.favorites_db(), PathBuf::from("/tmp/fx/favorites.db"));
        assert_eq!(config.log_file, PathBuf::from("/tmp/fx/currency-widget.log"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("EXCHANGE_RATE_API_KEY", "   ")]).unwrap();
        assert!(config.warning().is_some());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("EXCHANGE_RATE_API_KEY", "abc123"),
            ("FX_HISTORY_SOURCE", "queried"),
            ("FX_HISTORY_ACCESS_KEY", "hostkey"),
            ("FX_REQUEST_TIMEOUT_SECS", "5"),
            ("FX_LOG_FILE", "/var/log/fx.log"),
        ])
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert!(config.warning().is_none());
        assert_eq!(config.history_strategy, HistoryStrategy::Queried);
        assert_eq!(config.history_access_key.as_deref(), Some("hostkey"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_file, PathBuf::from("/var/log/fx.log"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("FX_HISTORY_SOURCE", "random")]).is_err());
        assert!(config_from(&[("FX_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
    }
}
