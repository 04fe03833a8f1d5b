//! Configuration types for gateway-sync
//!
//! All configuration structures are validated at startup; a bad value is a
//! fatal error before any gateway call is made.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Gateway API access configuration
    pub api: ApiConfig,

    /// Block/override domain sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.sources.validate()?;
        Ok(())
    }
}

/// Gateway API access configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API bearer token
    pub token: String,

    /// Gateway account identifier
    pub account_id: String,

    /// API base URL (default: the public gateway endpoint)
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl ApiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.token must not be empty".into(),
            ));
        }
        if self.account_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.account_id must not be empty".into(),
            ));
        }
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url is not an http(s) URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    crate::api::constants::API_BASE.to_string()
}

/// Domain source configuration
///
/// Both categories may be empty: an empty category means "nothing to do"
/// for that category, not an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Sources (file paths or http(s) URLs) of domains to block
    #[serde(default)]
    pub block: Vec<String>,

    /// Destination IP → sources of domains to redirect there
    #[serde(default)]
    pub redirect: BTreeMap<String, Vec<String>>,
}

impl SourcesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for destination in self.redirect.keys() {
            if destination.parse::<IpAddr>().is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "sources.redirect destination is not an IP address: {destination}"
                )));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                token: "token".into(),
                account_id: "acc".into(),
                base_url: default_base_url(),
            },
            sources: SourcesConfig::default(),
            log: LogConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut config = valid_config();
        config.api.token = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_sources_are_valid() {
        let config = valid_config();
        assert!(config.sources.block.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redirect_destination_must_be_ip() {
        let mut config = valid_config();
        config
            .sources
            .redirect
            .insert("not-an-ip".into(), vec!["hosts.txt".into()]);
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config
            .sources
            .redirect
            .insert("10.0.0.1".into(), vec!["hosts.txt".into()]);
        assert!(config.validate().is_ok());
    }
}
