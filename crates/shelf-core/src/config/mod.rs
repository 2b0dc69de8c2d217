//! Client configuration.
//!
//! Provides a unified `ClientConfig` used by every Shelf client to discover
//! the catalog service, its push endpoint and the engine's sync policies.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, is_ws_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 120;

/// How the engine treats records pushed by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushPolicy {
    /// Log inbound events and leave the projection untouched
    #[default]
    Ignore,
    /// Apply inbound records unless the local copy has unsynced edits
    MergeWhenClean,
}

impl FromStr for PushPolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "merge_when_clean" | "merge-when-clean" | "merge" => Ok(Self::MergeWhenClean),
            other => Err(Error::Config(format!("unknown push policy '{other}'"))),
        }
    }
}

/// Runtime configuration for talking to the catalog service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub push_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub push_policy: PushPolicy,
    /// Keep clean copies of fetched records in the local store for offline reads
    #[serde(default)]
    pub cache_clean_records: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            push_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            push_policy: PushPolicy::default(),
            cache_clean_records: false,
        }
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    /// Build a validated config for an explicit API base URL.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
        .validated()
    }

    /// Read configuration from `SHELF_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = normalize_text_option(lookup("SHELF_API_URL")) {
            config.api_base_url = url;
        }
        config.push_url = normalize_text_option(lookup("SHELF_PUSH_URL"));

        if let Some(raw) = normalize_text_option(lookup("SHELF_REQUEST_TIMEOUT_SECS")) {
            config.request_timeout_secs = raw.parse::<u64>().map_err(|_| {
                Error::Config("SHELF_REQUEST_TIMEOUT_SECS must be an integer".to_string())
            })?;
        }
        if let Some(raw) = normalize_text_option(lookup("SHELF_PUSH_POLICY")) {
            config.push_policy = raw.parse()?;
        }
        if let Some(raw) = normalize_text_option(lookup("SHELF_CACHE_CLEAN_RECORDS")) {
            config.cache_clean_records = matches!(
                raw.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        config.validated()
    }

    /// Normalize URLs and check value ranges.
    pub fn validated(mut self) -> Result<Self> {
        let api_base_url = normalize_text_option(Some(self.api_base_url))
            .ok_or_else(|| Error::Config("api_base_url must not be empty".to_string()))?;
        if !is_http_url(&api_base_url) {
            return Err(Error::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();

        self.push_url = match normalize_text_option(self.push_url) {
            Some(url) if is_ws_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(Error::Config(
                    "push_url must include ws:// or wss://".to_string(),
                ))
            }
            None => None,
        };

        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(Error::Config(format!(
                "request_timeout_secs must be in [1, {MAX_REQUEST_TIMEOUT_SECS}]"
            )));
        }

        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Push endpoint, derived from the API base URL when not set explicitly.
    pub fn resolved_push_url(&self) -> String {
        if let Some(url) = &self.push_url {
            return url.clone();
        }
        if let Some(rest) = self.api_base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.api_base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.api_base_url.clone()
        }
    }

    /// Load a config file; `Ok(None)` when it does not exist.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&content)?;
        config.validated().map(Some)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let normalized = self.clone().validated()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(|value| (*value).to_string())
    }

    #[test]
    fn defaults_point_at_local_service() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.push_policy, PushPolicy::Ignore);
        assert!(!config.cache_clean_records);
        assert_eq!(config.resolved_push_url(), "ws://localhost:3000");
    }

    #[test]
    fn env_values_override_defaults() {
        let mut map = HashMap::new();
        map.insert("SHELF_API_URL", " https://catalog.example.com/ ");
        map.insert("SHELF_REQUEST_TIMEOUT_SECS", "30");
        map.insert("SHELF_PUSH_POLICY", "merge_when_clean");
        map.insert("SHELF_CACHE_CLEAN_RECORDS", "yes");

        let config = ClientConfig::from_lookup(lookup_from(&map)).unwrap();
        assert_eq!(config.api_base_url, "https://catalog.example.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.push_policy, PushPolicy::MergeWhenClean);
        assert!(config.cache_clean_records);
        assert_eq!(config.resolved_push_url(), "wss://catalog.example.com");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ClientConfig::new("catalog.example.com").is_err());

        let mut map = HashMap::new();
        map.insert("SHELF_REQUEST_TIMEOUT_SECS", "0");
        assert!(ClientConfig::from_lookup(lookup_from(&map)).is_err());

        let mut map = HashMap::new();
        map.insert("SHELF_PUSH_URL", "http://catalog.example.com");
        let error = ClientConfig::from_lookup(lookup_from(&map)).unwrap_err();
        assert!(error.to_string().contains("ws://"));

        let mut map = HashMap::new();
        map.insert("SHELF_PUSH_POLICY", "sometimes");
        assert!(ClientConfig::from_lookup(lookup_from(&map)).is_err());
    }

    #[test]
    fn explicit_push_url_wins() {
        let mut map = HashMap::new();
        map.insert("SHELF_PUSH_URL", "ws://push.example.com/");
        let config = ClientConfig::from_lookup(lookup_from(&map)).unwrap();
        assert_eq!(config.resolved_push_url(), "ws://push.example.com");
    }

    #[test]
    fn config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shelf.json");

        assert_eq!(ClientConfig::load_from_path(&path).unwrap(), None);

        let config = ClientConfig {
            push_policy: PushPolicy::MergeWhenClean,
            ..ClientConfig::new("http://127.0.0.1:4000/").unwrap()
        };
        config.save_to_path(&path).unwrap();

        let loaded = ClientConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.api_base_url, "http://127.0.0.1:4000");
        assert_eq!(loaded.push_policy, PushPolicy::MergeWhenClean);
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.json");
        std::fs::write(&path, r#"{"api_base_url":"http://x","surprise":true}"#).unwrap();
        let error = ClientConfig::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }
}
