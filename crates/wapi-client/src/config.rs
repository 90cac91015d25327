//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration against a local backend.

use std::path::PathBuf;
use std::time::Duration;

use wapi_shared::constants::{ALERT_TTL_SECS, DEFAULT_PAGE_SIZE};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend (without the `/api` suffix).
    /// Env: `WAPI_BACKEND_URL`
    /// Default: `http://localhost:8000`
    pub backend_url: String,

    /// API key for the event catalog.
    /// Env: `WAPI_TICKET_KEY`
    /// Default: empty (catalog calls will be rejected upstream).
    pub ticket_key: String,

    /// Base URL of the event catalog.
    /// Env: `WAPI_CATALOG_URL`
    /// Default: `https://app.ticketmaster.com/discovery/v2`
    pub catalog_url: String,

    /// Directory holding the local database.
    /// Env: `WAPI_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Lifetime of transient alerts.
    /// Env: `WAPI_ALERT_TTL_SECS`
    /// Default: 6 seconds
    pub alert_ttl: Duration,

    /// Events per catalog page.
    /// Env: `WAPI_PAGE_SIZE`
    /// Default: 12
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            ticket_key: String::new(),
            catalog_url: "https://app.ticketmaster.com/discovery/v2".to_string(),
            data_dir: None,
            alert_ttl: Duration::from_secs(ALERT_TTL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("WAPI_BACKEND_URL").filter(|v| !v.trim().is_empty()) {
            config.backend_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(key) = lookup("WAPI_TICKET_KEY") {
            config.ticket_key = key;
        }

        if let Some(url) = lookup("WAPI_CATALOG_URL").filter(|v| !v.trim().is_empty()) {
            config.catalog_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(dir) = lookup("WAPI_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(val) = lookup("WAPI_ALERT_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.alert_ttl = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid WAPI_ALERT_TTL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("WAPI_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid WAPI_PAGE_SIZE, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.alert_ttl, Duration::from_secs(6));
        assert_eq!(config.page_size, 12);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WAPI_BACKEND_URL", "https://api.example.com/"),
            ("WAPI_TICKET_KEY", "k"),
            ("WAPI_ALERT_TTL_SECS", "10"),
            ("WAPI_DATA_DIR", "/tmp/wapi"),
        ]);
        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(config.ticket_key, "k");
        assert_eq!(config.alert_ttl, Duration::from_secs(10));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/wapi")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[("WAPI_ALERT_TTL_SECS", "soon"), ("WAPI_PAGE_SIZE", "0")]);
        assert_eq!(config.alert_ttl, Duration::from_secs(6));
        assert_eq!(config.page_size, 12);
    }
}
