//! Error types and Result alias for slotwatch

use thiserror::Error;

/// Main error type for slotwatch
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream answered with a non-2xx status. Only the code is trusted,
    /// the body is never parsed.
    #[error("received status {code} for {url}")]
    Status { code: u16, url: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// HTTP status code carried by this error, if it came from an upstream response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Error::InvalidData(err.to_string());
        }
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
