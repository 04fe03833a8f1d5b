//! Gateway API error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("HTTP request building failed: {0}")]
    HttpBuild(#[from] hyper::http::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// The gateway answered but refused the operation, either with a
    /// non-2xx status or with a `success: false` envelope. `detail`
    /// carries the server-provided error text verbatim.
    #[error("Gateway rejected {operation}: {detail}")]
    Rejected {
        operation: &'static str,
        detail: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization failed: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

impl ApiError {
    /// Check if the error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited(_) | ApiError::Request(_) | ApiError::Timeout(_)
        )
    }

    /// Check if the error is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }

    /// Get retry delay in seconds (if applicable)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited(seconds) => Some(*seconds),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
