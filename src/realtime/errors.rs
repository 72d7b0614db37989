//! # Real-Time Errors
//!
//! Error types for the change bus and the push feed.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    // ==================
    // Connection Errors
    // ==================
    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Invalid message format
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    // ==================
    // Publish Errors
    // ==================
    /// Nobody is listening
    #[error("No active subscribers")]
    NoSubscribers,

    /// Payload exceeds the configured limit
    #[error("Message too large (max: {0} bytes)")]
    MessageTooLarge(usize),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Returns the close code for WebSocket
    pub fn close_code(&self) -> u16 {
        match self {
            RealtimeError::ConnectionClosed => 1000,
            RealtimeError::InvalidMessage(_) => 1003,
            RealtimeError::NoSubscribers => 4010,
            RealtimeError::MessageTooLarge(_) => 4021,
            RealtimeError::Internal(_) => 4500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_close_codes() {
        assert_eq!(RealtimeError::ConnectionClosed.close_code(), 1000);
        assert_eq!(RealtimeError::MessageTooLarge(10).close_code(), 4021);
        assert_eq!(RealtimeError::Internal("x".into()).close_code(), 4500);
    }
}
