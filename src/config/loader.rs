//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment
//! variables.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}")))?;

    config.validate()?;

    info!(
        "Configuration loaded: {} block sources, {} redirect destinations",
        config.sources.block.len(),
        config.sources.redirect.len()
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `GATEWAY_SYNC_API_TOKEN`: Override API token
/// - `GATEWAY_SYNC_ACCOUNT_ID`: Override account id
/// - `GATEWAY_SYNC_BLOCK_SOURCES`: Override block sources (comma-separated)
/// - `GATEWAY_SYNC_REDIRECT_SOURCES`: Override redirect sources
///   (`ip=source|source,ip=source` format)
/// - `GATEWAY_SYNC_LOG_LEVEL`: Override log level
///
/// An override that names an empty source set is valid and clears the
/// corresponding category.
///
/// # Errors
///
/// Returns `ConfigError` if loading or parsing fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;

    if let Ok(token) = std::env::var("GATEWAY_SYNC_API_TOKEN") {
        config.api.token = token;
        debug!("API token overridden from environment");
    }

    if let Ok(account) = std::env::var("GATEWAY_SYNC_ACCOUNT_ID") {
        config.api.account_id = account;
        debug!("Account id overridden from environment");
    }

    if let Ok(sources) = std::env::var("GATEWAY_SYNC_BLOCK_SOURCES") {
        config.sources.block = split_sources(&sources);
        debug!(
            "Block sources overridden to {} entries",
            config.sources.block.len()
        );
    }

    if let Ok(spec) = std::env::var("GATEWAY_SYNC_REDIRECT_SOURCES") {
        config.sources.redirect =
            parse_redirect_spec(&spec).map_err(|reason| ConfigError::EnvError {
                name: "GATEWAY_SYNC_REDIRECT_SOURCES".into(),
                reason,
            })?;
        debug!(
            "Redirect sources overridden to {} destinations",
            config.sources.redirect.len()
        );
    }

    if let Ok(level) = std::env::var("GATEWAY_SYNC_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    config.validate()?;

    Ok(config)
}

/// Parse a redirect source specification
///
/// Format: comma-separated `destination=source|source` entries, e.g.
/// `10.0.0.1=hosts/work.txt,10.0.0.2=hosts/lab.txt|hosts/extra.txt`.
/// An empty specification yields an empty map.
///
/// # Errors
///
/// Returns a reason string if an entry is missing the `=` separator or
/// names no sources.
pub fn parse_redirect_spec(spec: &str) -> Result<BTreeMap<String, Vec<String>>, String> {
    let mut redirect = BTreeMap::new();

    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((destination, sources)) = entry.split_once('=') else {
            return Err(format!("entry is missing '=': {entry}"));
        };

        let sources = sources
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        if sources.is_empty() {
            return Err(format!("no sources for destination {destination}"));
        }

        redirect.insert(destination.trim().to_string(), sources);
    }

    Ok(redirect)
}

fn split_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Write a default configuration file to the given path
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let default = serde_json::json!({
        "api": {
            "token": "REPLACE_WITH_API_TOKEN",
            "account_id": "REPLACE_WITH_ACCOUNT_ID",
        },
        "sources": {
            "block": [],
            "redirect": {},
        },
        "log": {
            "level": "info",
        },
    });

    let contents = serde_json::to_string_pretty(&default)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_str() {
        let config = load_config_str(
            r#"{
                "api": {"token": "t", "account_id": "a"},
                "sources": {
                    "block": ["blocklist.txt"],
                    "redirect": {"10.0.0.1": ["override.txt"]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.sources.block, vec!["blocklist.txt"]);
        assert_eq!(
            config.sources.redirect["10.0.0.1"],
            vec!["override.txt".to_string()]
        );
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_config_str_rejects_bad_destination() {
        let result = load_config_str(
            r#"{
                "api": {"token": "t", "account_id": "a"},
                "sources": {"redirect": {"example.com": ["x.txt"]}}
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/gateway-sync.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_parse_redirect_spec() {
        let map = parse_redirect_spec("10.0.0.1=a.txt,10.0.0.2=b.txt|c.txt").unwrap();
        assert_eq!(map["10.0.0.1"], vec!["a.txt".to_string()]);
        assert_eq!(map["10.0.0.2"], vec!["b.txt".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn test_parse_redirect_spec_empty() {
        assert!(parse_redirect_spec("").unwrap().is_empty());
        assert!(parse_redirect_spec(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_redirect_spec_errors() {
        assert!(parse_redirect_spec("10.0.0.1").is_err());
        assert!(parse_redirect_spec("10.0.0.1=").is_err());
    }

    #[test]
    fn test_create_default_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        create_default_config(&path).unwrap();

        // The template parses but fails validation only when fields are blanked
        let config = load_config(&path).unwrap();
        assert!(config.sources.block.is_empty());
    }
}
