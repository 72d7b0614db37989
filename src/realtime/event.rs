//! # Change Events
//!
//! Lightweight "state changed" notifications. Payloads are hints only;
//! consumers re-fetch the full state on every event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::Artist;

/// What kind of mutation produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    VoteAdded,
    ArtistAdded,
    ArtistDeleted,
    ArtistBlocked,
    GlobalVotingToggled,
    VotesReset,
    StateReset,
    /// The subscriber fell behind and missed events
    Resync,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::VoteAdded => "VOTE_ADDED",
            ChangeKind::ArtistAdded => "ARTIST_ADDED",
            ChangeKind::ArtistDeleted => "ARTIST_DELETED",
            ChangeKind::ArtistBlocked => "ARTIST_BLOCKED",
            ChangeKind::GlobalVotingToggled => "GLOBAL_VOTING_TOGGLED",
            ChangeKind::VotesReset => "VOTES_RESET",
            ChangeKind::StateReset => "STATE_RESET",
            ChangeKind::Resync => "RESYNC",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A published change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonically increasing per bus; 0 for locally synthesized events
    pub sequence: u64,

    pub kind: ChangeKind,

    /// Advisory detail about the change
    #[serde(default)]
    pub payload: Value,

    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(sequence: u64, kind: ChangeKind, payload: Value) -> Self {
        Self {
            sequence,
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Synthesized when `skipped` events were dropped for a slow subscriber
    pub fn resync(skipped: u64) -> Self {
        Self::new(0, ChangeKind::Resync, json!({ "skipped": skipped }))
    }
}

// Payload builders used by the voting service.

pub fn vote_added_payload(artist_id: &str, option: &str, last_update: i64) -> Value {
    json!({ "artist_id": artist_id, "option": option, "last_update": last_update })
}

pub fn artist_added_payload(artist: &Artist, last_update: i64) -> Value {
    json!({ "artist": artist, "last_update": last_update })
}

pub fn artist_deleted_payload(id: &str, last_update: i64) -> Value {
    json!({ "id": id, "last_update": last_update })
}

pub fn artist_blocked_payload(artist_id: &str, is_blocked: bool, last_update: i64) -> Value {
    json!({ "artist_id": artist_id, "is_blocked": is_blocked, "last_update": last_update })
}

pub fn global_voting_payload(enabled: bool, last_update: i64) -> Value {
    json!({ "enabled": enabled, "last_update": last_update })
}

pub fn reset_payload(last_update: i64) -> Value {
    json!({ "last_update": last_update })
}
