//! Sync client error types

use thiserror::Error;

/// Result type for client-side synchronization
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Full-state fetch failed
    #[error("state fetch failed: {0}")]
    FetchFailed(String),

    /// The server answered with something that is not a state snapshot
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Push feed could not be established
    #[error("push feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Push feed ended
    #[error("push feed closed")]
    FeedClosed,

    /// No frame arrived within the idle timeout
    #[error("push feed idle for {0} ms")]
    FeedIdle(u64),

    /// Server-reported error on the feed
    #[error("push feed error {code}: {message}")]
    FeedError { code: u16, message: String },
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::FetchFailed(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => SyncError::FeedClosed,
            other => SyncError::FeedUnavailable(other.to_string()),
        }
    }
}
