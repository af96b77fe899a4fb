//! Error types for the persistence sinks.

use thiserror::Error;

/// Errors from the local workbook and the remote sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// No service-account key or spreadsheet id configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The service-account key could not be used.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// The remote sink was disabled after a permanent failure.
    #[error("remote sheet disabled")]
    Disabled,

    /// HTTP 429 or a quota signal from the Sheets API.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Sheets API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Truncated response body.
        message: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Unexpected response shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local workbook could not be read or written.
    #[error("local workbook error: {0}")]
    Local(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

const MAX_BODY_EXCERPT: usize = 200;

impl SheetError {
    /// Creates an API error, classifying quota responses as rate limits.
    pub fn api(status_code: u16, body: impl AsRef<str>) -> Self {
        let message: String = body.as_ref().chars().take(MAX_BODY_EXCERPT).collect();
        if status_code == 429 || is_quota_message(&message) {
            return Self::RateLimited(message);
        }
        Self::Api {
            status_code,
            message,
        }
    }

    /// Creates a local workbook error.
    pub fn local(message: impl std::fmt::Display) -> Self {
        Self::Local(message.to_string())
    }

    /// Returns true if the caller should back off before retrying.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Returns true if the remote sink can never work with this configuration.
    #[must_use]
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials(_) | Self::Disabled)
    }

    /// Returns true if a retry with a fresh connection may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500 || *status_code == 401,
            _ => false,
        }
    }
}

fn is_quota_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("quota") || lower.contains("resource_exhausted")
}

impl From<reqwest::Error> for SheetError {
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

impl From<serde_json::Error> for SheetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SheetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::local(err)
    }
}

impl From<calamine::XlsxError> for SheetError {
    fn from(err: calamine::XlsxError) -> Self {
        Self::local(err)
    }
}

impl From<std::io::Error> for SheetError {
    fn from(err: std::io::Error) -> Self {
        Self::local(err)
    }
}

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SheetError>;
