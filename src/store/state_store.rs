//! # State Store
//!
//! Single source of truth for the voting state.
//!
//! Mutations are serialized by a writer mutex held across the whole
//! read-modify-persist cycle: the closure works on a copy, the copy is
//! persisted, and only then swapped in under a short write lock. Readers
//! never wait on storage I/O and see either the complete old state or the
//! complete new one, `last_update` included. Concurrent votes for the same
//! option are serialized rather than lost.

use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{StorageBackend, STATE_KEY, VERSION_KEY};
use super::errors::{StoreError, StoreResult};
use super::model::{
    Artist, GlobalState, NewArtist, RejectReason, StateSnapshot, VoteOption, VoteOutcome,
    VoteRecord, DEFAULT_HISTORY_CAP, STATE_VERSION,
};
use super::seed::seed_state;

/// Atomic access to the authoritative voting state
pub trait StateStore: Send + Sync {
    /// Full consistent snapshot; degrades to seed data if the state is unreadable
    fn get_state(&self) -> GlobalState;

    /// Create an artist at the end of the roster
    fn add_artist(&self, artist: NewArtist) -> StoreResult<Artist>;

    /// Remove an artist and its history; `false` if the id is unknown
    fn delete_artist(&self, id: &str) -> StoreResult<bool>;

    /// Count one vote if the artist exists, is open and voting is enabled
    fn cast_vote(
        &self,
        artist_id: &str,
        option: &str,
        user_agent: &str,
        client_ip: Option<&str>,
    ) -> StoreResult<VoteOutcome>;

    /// Block or unblock an artist; `false` if the id is unknown
    fn set_artist_blocked(&self, artist_id: &str, blocked: bool) -> StoreResult<bool>;

    /// Switch voting on or off for the whole event; returns the new value
    fn set_global_voting(&self, enabled: bool) -> StoreResult<bool>;

    /// Zero all counters and clear history, keeping the roster
    fn reset_votes(&self) -> StoreResult<()>;

    /// Replace everything with the seed dataset
    fn force_reset(&self) -> StoreResult<()>;

    /// Client-facing view of the current state
    fn snapshot(&self) -> StateSnapshot {
        self.get_state().snapshot()
    }

    /// Vote history, most recent first
    fn history(&self) -> Vec<VoteRecord> {
        self.get_state().history_newest_first()
    }

    /// Staleness marker of the current state
    fn last_update(&self) -> i64 {
        self.get_state().last_update
    }
}

/// Production store: state cached behind a lock, persisted through a backend
#[derive(Debug)]
pub struct SharedStateStore {
    backend: Arc<dyn StorageBackend>,
    state: RwLock<GlobalState>,
    writer: Mutex<()>,
    history_cap: usize,
}

impl SharedStateStore {
    /// Open the store with the default history cap
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_history_cap(backend, DEFAULT_HISTORY_CAP)
    }

    /// Open the store, loading the persisted state or reseeding it
    pub fn with_history_cap(backend: Arc<dyn StorageBackend>, history_cap: usize) -> Self {
        let state = match load_persisted(backend.as_ref()) {
            Ok(Some(state)) => {
                info!(
                    artists = state.artists.len(),
                    history = state.vote_history.len(),
                    "STATE_LOADED"
                );
                state
            }
            Ok(None) => reseed(backend.as_ref()),
            Err(e) => {
                warn!(error = %e, "STATE_LOAD_FAILED");
                reseed(backend.as_ref())
            }
        };

        Self {
            backend,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            history_cap: history_cap.max(1),
        }
    }

    /// Maximum number of retained vote records
    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Apply `f` to a copy of the state and commit it if it reports a change.
    ///
    /// `f` returns the caller's value and whether the state changed. Unchanged
    /// results are returned without persisting or stamping `last_update`.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut GlobalState) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::unavailable("Writer lock poisoned"))?;

        // Only writers change the state, so this copy stays current until the swap.
        let mut next = self
            .state
            .read()
            .map_err(|_| StoreError::unavailable("Lock poisoned"))?
            .clone();
        let (value, changed) = f(&mut next)?;
        if !changed {
            return Ok(value);
        }

        next.touch();
        persist(self.backend.as_ref(), &next)?;

        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::unavailable("Lock poisoned"))?;
        *guard = next;
        Ok(value)
    }
}

impl StateStore for SharedStateStore {
    fn get_state(&self) -> GlobalState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(_) => {
                warn!("STATE_READ_DEGRADED");
                seed_state()
            }
        }
    }

    fn last_update(&self) -> i64 {
        match self.state.read() {
            Ok(state) => state.last_update,
            Err(_) => 0,
        }
    }

    fn add_artist(&self, artist: NewArtist) -> StoreResult<Artist> {
        let (name, time_slot, options) = validate_new_artist(artist)?;

        let created = self.mutate(|state| {
            let artist = Artist::new(Uuid::new_v4().to_string(), name, time_slot, options);
            state.artists.push(artist.clone());
            Ok((artist, true))
        })?;

        info!(artist_id = %created.id, name = %created.name, "ARTIST_ADDED");
        Ok(created)
    }

    fn delete_artist(&self, id: &str) -> StoreResult<bool> {
        let removed = self.mutate(|state| {
            let before = state.artists.len();
            state.artists.retain(|a| a.id != id);
            if state.artists.len() == before {
                return Ok((false, false));
            }
            state.vote_history.retain(|r| r.artist_id != id);
            Ok((true, true))
        })?;

        if removed {
            info!(artist_id = %id, "ARTIST_DELETED");
        } else {
            debug!(artist_id = %id, "ARTIST_DELETE_NOOP");
        }
        Ok(removed)
    }

    fn cast_vote(
        &self,
        artist_id: &str,
        option: &str,
        user_agent: &str,
        client_ip: Option<&str>,
    ) -> StoreResult<VoteOutcome> {
        let cap = self.history_cap;
        let outcome = self.mutate(|state| {
            let enabled = state.global_voting_enabled;
            let Some(artist) = state.artist_mut(artist_id) else {
                return Ok((VoteOutcome::Rejected(RejectReason::UnknownArtist), false));
            };
            if !enabled {
                return Ok((VoteOutcome::Rejected(RejectReason::VotingClosed), false));
            }
            if artist.is_blocked {
                return Ok((VoteOutcome::Rejected(RejectReason::ArtistBlocked), false));
            }
            if !artist.record_vote(option) {
                return Ok((VoteOutcome::Rejected(RejectReason::UnknownOption), false));
            }

            let record = VoteRecord::new(artist, option, user_agent, client_ip.map(str::to_string));
            state.push_history(record, cap);
            Ok((VoteOutcome::Recorded, true))
        })?;

        match outcome {
            VoteOutcome::Recorded => debug!(artist_id, option, "VOTE_RECORDED"),
            VoteOutcome::Rejected(reason) => {
                debug!(artist_id, option, reason = reason.as_str(), "VOTE_REJECTED")
            }
        }
        Ok(outcome)
    }

    fn set_artist_blocked(&self, artist_id: &str, blocked: bool) -> StoreResult<bool> {
        let found = self.mutate(|state| match state.artist_mut(artist_id) {
            Some(artist) => {
                artist.is_blocked = blocked;
                Ok((true, true))
            }
            None => Ok((false, false)),
        })?;

        if found {
            info!(artist_id, blocked, "ARTIST_BLOCKED");
        }
        Ok(found)
    }

    fn set_global_voting(&self, enabled: bool) -> StoreResult<bool> {
        self.mutate(|state| {
            state.global_voting_enabled = enabled;
            Ok(((), true))
        })?;

        info!(enabled, "GLOBAL_VOTING_TOGGLED");
        Ok(enabled)
    }

    fn reset_votes(&self) -> StoreResult<()> {
        self.mutate(|state| {
            for artist in &mut state.artists {
                artist.clear_votes();
            }
            state.vote_history.clear();
            Ok(((), true))
        })?;

        info!("VOTES_RESET");
        Ok(())
    }

    fn force_reset(&self) -> StoreResult<()> {
        self.mutate(|state| {
            let previous = state.last_update;
            *state = seed_state();
            // touch() runs after this and must still move past the old stamp
            state.last_update = previous;
            Ok(((), true))
        })?;

        // The blob is already committed; a stale marker only forces a reseed on next open.
        if let Err(e) = self
            .backend
            .put(VERSION_KEY, STATE_VERSION.to_string().as_bytes())
        {
            warn!(error = %e, "VERSION_MARKER_WRITE_FAILED");
        }
        info!("STATE_RESET");
        Ok(())
    }
}

/// Check and normalize creation input
fn validate_new_artist(artist: NewArtist) -> StoreResult<(String, String, [VoteOption; 2])> {
    let name = artist.name.trim().to_string();
    let time_slot = artist.time_slot.trim().to_string();

    if name.is_empty() {
        return Err(StoreError::validation("name is required"));
    }
    if time_slot.is_empty() {
        return Err(StoreError::validation("time_slot is required"));
    }

    let options: Vec<VoteOption> = artist
        .options
        .into_iter()
        .map(|o| VoteOption::new(o.title.trim(), o.description.trim()))
        .collect();

    let options: [VoteOption; 2] = options.try_into().map_err(|v: Vec<VoteOption>| {
        StoreError::validation(format!("exactly 2 options required, got {}", v.len()))
    })?;

    if options.iter().any(|o| o.title.is_empty()) {
        return Err(StoreError::validation("option titles must not be empty"));
    }
    if options[0].title == options[1].title {
        return Err(StoreError::validation("options must be distinct"));
    }

    Ok((name, time_slot, options))
}

/// Read the persisted state if its version marker matches
fn load_persisted(backend: &dyn StorageBackend) -> StoreResult<Option<GlobalState>> {
    let Some(marker) = backend.get(VERSION_KEY)? else {
        return Ok(None);
    };

    let version = String::from_utf8_lossy(&marker).trim().parse::<u32>().ok();
    if version != Some(STATE_VERSION) {
        info!(found = ?version, expected = STATE_VERSION, "STATE_VERSION_MISMATCH");
        return Ok(None);
    }

    let Some(blob) = backend.get(STATE_KEY)? else {
        return Ok(None);
    };

    let mut state: GlobalState = serde_json::from_slice(&blob)?;
    if state.version != STATE_VERSION {
        return Ok(None);
    }
    for artist in &mut state.artists {
        artist.recompute_total();
    }
    Ok(Some(state))
}

/// Write the seed dataset; a failed write still yields the seed in memory
fn reseed(backend: &dyn StorageBackend) -> GlobalState {
    let state = seed_state();
    let written = persist(backend, &state)
        .and_then(|_| backend.put(VERSION_KEY, STATE_VERSION.to_string().as_bytes()));

    match written {
        Ok(()) => info!(artists = state.artists.len(), "STATE_SEEDED"),
        Err(e) => warn!(error = %e, "STATE_SEED_PERSIST_FAILED"),
    }
    state
}

fn persist(backend: &dyn StorageBackend, state: &GlobalState) -> StoreResult<()> {
    let blob = serde_json::to_vec(state)
        .map_err(|e| StoreError::unavailable(format!("Failed to encode state: {}", e)))?;
    backend.put(STATE_KEY, &blob)
}
