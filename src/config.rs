//! Engine configuration
//!
//! Every field has a default, so an empty JSON object (or `Default::default()`)
//! is a complete configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote document fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Whole-request timeout, connect and body included
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Larger responses fail with `LoadError::TooLarge`
    pub max_body_bytes: usize,
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Settings for a [`QueryEngine`](crate::QueryEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub loader: LoaderConfig,
    /// Compiled expressions kept in the LRU cache; 0 disables it
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            loader: LoaderConfig::default(),
            cache_capacity: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.loader.timeout(), Duration::from_secs(30));
        assert_eq!(config.loader.max_body_bytes, 16 * 1024 * 1024);
        assert!(config.loader.user_agent.starts_with("nsxpath/"));
    }

    #[test]
    fn partial_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cache_capacity": 0, "loader": {"timeout_secs": 5}}"#).unwrap();
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.loader.timeout_secs, 5);
        assert_eq!(config.loader.connect_timeout_secs, 10);
    }
}
