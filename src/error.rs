//! Error types for gateway-sync
//!
//! Top-level error hierarchy. Subsystems with a larger error surface
//! (the API client, the reconcile engine) define their own error enums
//! in their modules; this file holds the aggregate type and the
//! configuration errors.

use thiserror::Error;

use crate::api::ApiError;
use crate::reconcile::ReconcileError;
use crate::sources::SourceError;

/// Top-level error type for gateway-sync
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Gateway API errors outside the reconcile engine
    #[error("Gateway API error: {0}")]
    Api(#[from] ApiError),

    /// Domain source loading errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Reconciliation errors (stale removal, rule/list creation)
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl SyncError {
    /// Check if this error is recoverable (a retry of the whole run may succeed)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Api(e) => e.is_recoverable(),
            Self::Source(e) => e.is_recoverable(),
            Self::Reconcile(e) => e.is_recoverable(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),
}
