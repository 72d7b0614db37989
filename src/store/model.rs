//! # Voting State Model
//!
//! Artists, vote records and the global state blob owned by the store.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version of the persisted state blob.
///
/// A stored blob carrying any other version is discarded and reseeded.
pub const STATE_VERSION: u32 = 3;

/// Default maximum number of retained vote records
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// One of the two style choices offered for an artist.
///
/// The `title` is the vote key: it must be unique within an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOption {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl VoteOption {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Key used in [`Artist::votes`]
    pub fn key(&self) -> &str {
        &self.title
    }
}

/// A performing act with exactly two vote-able options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub time_slot: String,
    pub options: [VoteOption; 2],
    pub votes: BTreeMap<String, u64>,
    pub total_votes: u64,
    pub is_blocked: bool,
}

impl Artist {
    /// Create an artist with zeroed counters for both options
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        time_slot: impl Into<String>,
        options: [VoteOption; 2],
    ) -> Self {
        let votes = options
            .iter()
            .map(|option| (option.key().to_string(), 0))
            .collect();

        Self {
            id: id.into(),
            name: name.into(),
            time_slot: time_slot.into(),
            options,
            votes,
            total_votes: 0,
            is_blocked: false,
        }
    }

    /// Whether `option` is one of this artist's vote keys
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o.key() == option)
    }

    /// Count one vote for `option` and recompute the total.
    ///
    /// Returns false (and changes nothing) for an unknown option.
    pub fn record_vote(&mut self, option: &str) -> bool {
        if !self.has_option(option) {
            return false;
        }
        *self.votes.entry(option.to_string()).or_insert(0) += 1;
        self.recompute_total();
        true
    }

    /// Zero every counter
    pub fn clear_votes(&mut self) {
        for count in self.votes.values_mut() {
            *count = 0;
        }
        self.recompute_total();
    }

    /// Recompute `total_votes` from `votes`
    pub fn recompute_total(&mut self) {
        self.total_votes = self.votes.values().sum();
    }

    /// Current count for one option
    pub fn votes_for(&self, option: &str) -> u64 {
        self.votes.get(option).copied().unwrap_or(0)
    }
}

/// One historical vote entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub selected_option: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(
        artist: &Artist,
        selected_option: &str,
        user_agent: &str,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            artist_id: artist.id.clone(),
            artist_name: artist.name.clone(),
            selected_option: selected_option.to_string(),
            user_agent: user_agent.to_string(),
            ip_address,
            created_at: Utc::now(),
        }
    }
}

/// Authoritative voting state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    pub artists: Vec<Artist>,
    /// Oldest first
    pub vote_history: VecDeque<VoteRecord>,
    pub global_voting_enabled: bool,
    /// Milliseconds since the Unix epoch of the last successful mutation
    pub last_update: i64,
}

impl GlobalState {
    pub fn artist(&self, id: &str) -> Option<&Artist> {
        self.artists.iter().find(|a| a.id == id)
    }

    pub fn artist_mut(&mut self, id: &str) -> Option<&mut Artist> {
        self.artists.iter_mut().find(|a| a.id == id)
    }

    /// Append a record, evicting the oldest entries beyond `cap`
    pub fn push_history(&mut self, record: VoteRecord, cap: usize) {
        self.vote_history.push_back(record);
        while self.vote_history.len() > cap {
            self.vote_history.pop_front();
        }
    }

    /// History with the most recent vote first
    pub fn history_newest_first(&self) -> Vec<VoteRecord> {
        self.vote_history.iter().rev().cloned().collect()
    }

    /// Stamp a new `last_update`, never going backwards
    pub fn touch(&mut self) {
        let now = Utc::now().timestamp_millis();
        self.last_update = now.max(self.last_update + 1);
    }

    /// Lightweight view served to clients
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            artists: self.artists.clone(),
            global_voting_enabled: self.global_voting_enabled,
            last_update: self.last_update,
        }
    }
}

/// What clients fetch and cache: everything except the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub artists: Vec<Artist>,
    pub global_voting_enabled: bool,
    pub last_update: i64,
}

impl StateSnapshot {
    pub fn artist(&self, id: &str) -> Option<&Artist> {
        self.artists.iter().find(|a| a.id == id)
    }
}

/// Input for creating an artist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArtist {
    pub name: String,
    pub time_slot: String,
    pub options: Vec<VoteOption>,
}

/// Result of a single vote attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded,
    Rejected(RejectReason),
}

impl VoteOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, VoteOutcome::Recorded)
    }
}

/// Why a well-formed vote was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownArtist,
    UnknownOption,
    ArtistBlocked,
    VotingClosed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::UnknownArtist => "unknown_artist",
            RejectReason::UnknownOption => "unknown_option",
            RejectReason::ArtistBlocked => "artist_blocked",
            RejectReason::VotingClosed => "voting_closed",
        }
    }
}
