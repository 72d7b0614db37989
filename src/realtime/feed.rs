//! # Push Feed Protocol
//!
//! JSON text frames exchanged over the change-feed WebSocket.

use serde::{Deserialize, Serialize};

use super::errors::{RealtimeError, RealtimeResult};
use super::event::ChangeEvent;

/// Message from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// First frame after the upgrade
    Connected {
        connection_id: String,
        last_update: i64,
    },

    /// A state change; the client should re-fetch
    Change { event: ChangeEvent },

    /// Heartbeat, either periodic or in reply to a client heartbeat
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ref_id: Option<String>,
        server_time: i64,
    },

    /// Error message
    Error { message: String, code: u16 },
}

impl FeedMessage {
    pub fn heartbeat(ref_id: Option<String>) -> Self {
        FeedMessage::Heartbeat {
            ref_id,
            server_time: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn error(err: &RealtimeError) -> Self {
        FeedMessage::Error {
            message: err.to_string(),
            code: err.close_code(),
        }
    }

    pub fn encode(&self) -> RealtimeResult<String> {
        serde_json::to_string(self).map_err(|e| RealtimeError::Internal(e.to_string()))
    }

    pub fn decode(text: &str) -> RealtimeResult<Self> {
        serde_json::from_str(text).map_err(|e| RealtimeError::InvalidMessage(e.to_string()))
    }
}

/// Message from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat/ping
    Heartbeat {
        #[serde(default)]
        ref_id: Option<String>,
    },
}

impl ClientMessage {
    pub fn decode(text: &str) -> RealtimeResult<Self> {
        serde_json::from_str(text).map_err(|e| RealtimeError::InvalidMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::event::ChangeKind;

    #[test]
    fn test_change_frame_shape() {
        let msg = FeedMessage::Change {
            event: ChangeEvent::new(3, ChangeKind::VotesReset, serde_json::json!({})),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "change");
        assert_eq!(value["event"]["kind"], "VOTES_RESET");
        assert_eq!(value["event"]["sequence"], 3);
    }

    #[test]
    fn test_decode_round_trip() {
        let msg = FeedMessage::Connected {
            connection_id: "c-1".into(),
            last_update: 99,
        };
        assert_eq!(FeedMessage::decode(&msg.encode().unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_client_heartbeat_without_ref() {
        let msg = ClientMessage::decode(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Heartbeat { ref_id: None });
    }

    #[test]
    fn test_invalid_client_message() {
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"subscribe"}"#),
            Err(RealtimeError::InvalidMessage(_))
        ));
    }
}
