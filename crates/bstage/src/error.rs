//! Error types for the BStage Plus integration.
//!
//! Errors never escape the fetcher as failures of the tick: they are logged
//! and turned into `None`/`false` at the component boundary.

use thiserror::Error;

/// Errors that can occur when talking to BStage Plus.
#[derive(Debug, Error)]
pub enum BstageError {
    /// A step of the login or refresh chain failed.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The bearer token was rejected (HTTP 401).
    #[error("unauthorized: access token rejected")]
    Unauthorized,

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Truncated response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Longest response body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 200;

impl BstageError {
    /// Creates an API error from status code and body, truncating the body.
    pub fn api(status_code: u16, body: impl AsRef<str>) -> Self {
        Self::Api {
            status_code,
            message: excerpt(body.as_ref()),
        }
    }

    /// Creates an authentication error for a failed chain step.
    pub fn auth_step(step: &str, status_code: u16, body: impl AsRef<str>) -> Self {
        Self::Authentication(format!(
            "{step} failed: {status_code} - {}",
            excerpt(body.as_ref())
        ))
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the token was rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns true if the request may succeed on the next tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_BODY_EXCERPT).collect()
}

impl From<reqwest::Error> for BstageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BstageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for BStage operations.
pub type Result<T> = std::result::Result<T, BstageError>;
