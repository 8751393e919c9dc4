//! Error types for the terminal

use thiserror::Error;

/// Terminal-wide error type
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("resource not available")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeedError {
    pub fn network(msg: impl Into<String>) -> Self {
        FeedError::Network(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        FeedError::Api(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FeedError::Parse(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        FeedError::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        FeedError::Internal(msg.into())
    }

    /// Whether this error belongs to the live-fetch failure class that the
    /// resolution chain absorbs by falling through to the persisted store.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_) | FeedError::Api(_) | FeedError::Parse(_)
        )
    }
}

/// Result type alias for terminal operations
pub type FeedResult<T> = Result<T, FeedError>;
