// =============================================================================
// Runtime Configuration — collaborator endpoints and startup settings
// =============================================================================
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file. Environment variables (`CANDELA_*`) override
// file values; `.env` is loaded by main before this runs.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_feed_base_url() -> String {
    "ws://127.0.0.1:8000/ws/stock".to_string()
}

fn default_ticker() -> String {
    "VIC".to_string()
}

fn default_api_bind() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_feed_reconnect_secs() -> u64 {
    5
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Root of the historical-data REST collaborator.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Static token for the REST collaborator; empty disables auth.
    #[serde(default)]
    pub api_token: String,

    /// Base of the per-instrument tick feed; the active ticker is appended
    /// as a path segment.
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    /// Instrument selected at startup.
    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    /// Bind address for the chart API server.
    #[serde(default = "default_api_bind")]
    pub api_bind: String,

    /// Delay before reconnecting a dropped feed stream.
    #[serde(default = "default_feed_reconnect_secs")]
    pub feed_reconnect_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: String::new(),
            feed_base_url: default_feed_base_url(),
            default_ticker: default_ticker(),
            api_bind: default_api_bind(),
            feed_reconnect_secs: default_feed_reconnect_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            ticker = %config.default_ticker,
            "config loaded"
        );

        Ok(config)
    }

    /// Apply `CANDELA_*` environment-variable overrides on top of whatever
    /// was loaded from disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CANDELA_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Ok(v) = std::env::var("CANDELA_API_TOKEN") {
            self.api_token = v;
        }
        if let Ok(v) = std::env::var("CANDELA_FEED_BASE_URL") {
            self.feed_base_url = v;
        }
        if let Ok(v) = std::env::var("CANDELA_DEFAULT_TICKER") {
            self.default_ticker = v.trim().to_uppercase();
        }
        if let Ok(v) = std::env::var("CANDELA_API_BIND") {
            self.api_bind = v;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_ticker, "VIC");
        assert_eq!(cfg.feed_reconnect_secs, 5);
        assert!(cfg.api_token.is_empty());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{ "default_ticker": "FPT" }"#).unwrap();
        assert_eq!(cfg.default_ticker, "FPT");
        assert_eq!(cfg.api_base_url, default_api_base_url());
        assert_eq!(cfg.api_bind, default_api_bind());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(RuntimeConfig::load("/nonexistent/candela.json").is_err());
    }
}
