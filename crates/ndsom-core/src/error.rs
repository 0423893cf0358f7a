use thiserror::Error;

/// Application-wide error types for the NDS-OM tracker.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown table or strategy, missing tab mapping, or invalid settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The source answered with a non-success status or the request failed.
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A required table, header row, or body section is missing from the page.
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Content could not be decoded into records.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Headless browser could not be launched or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Database operation or commit failed. Any open batch has been rolled back.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying on the next
    /// scheduled run.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::FetchError(msg) => {
                msg.contains("HTTP 5")
                    || msg.contains("HTTP 429")
                    || msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
            }
            AppError::PersistenceError(msg) => msg.contains("connect") || msg.contains("pool"),
            _ => false,
        }
    }
}
