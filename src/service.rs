//! # Voting Service
//!
//! The server-side facade over the state store and the change bus. Every
//! successful mutation is announced on the bus afterwards; a failed
//! announcement never affects the mutation.
//!
//! Store writes run on the blocking pool so that a slow storage backend
//! cannot stall the async workers. A write is only acknowledged once the
//! backend has accepted it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::observability::MetricsRegistry;
use crate::realtime::event::{
    artist_added_payload, artist_blocked_payload, artist_deleted_payload, global_voting_payload,
    reset_payload, vote_added_payload,
};
use crate::realtime::{ChangeBus, ChangeKind, ChangeSubscription};
use crate::store::{
    Artist, NewArtist, StateSnapshot, StateStore, StoreError, StoreResult, VoteOutcome,
    VoteRecord,
};

/// Result of a batch vote submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Votes that were counted
    pub processed: usize,
    /// Votes refused by the current state
    pub rejected: usize,
    /// `last_update` of the state after the batch
    pub timestamp: i64,
}

/// One vote submission: artist id to selected option
pub type VoteBallot = BTreeMap<String, String>;

/// Shared voting facade handed to every handler
#[derive(Clone)]
pub struct VotingService {
    store: Arc<dyn StateStore>,
    bus: Arc<ChangeBus>,
    metrics: Arc<MetricsRegistry>,
}

impl std::fmt::Debug for VotingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotingService")
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

impl VotingService {
    pub fn new(store: Arc<dyn StateStore>, bus: Arc<ChangeBus>) -> Self {
        Self::with_metrics(store, bus, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(
        store: Arc<dyn StateStore>,
        bus: Arc<ChangeBus>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self { store, bus, metrics }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Subscribe to the change feed
    pub fn subscribe(&self) -> ChangeSubscription {
        self.bus.subscribe()
    }

    // ==================
    // Reads
    // ==================

    /// Current artists, switch and staleness marker
    pub fn fetch_state(&self) -> StateSnapshot {
        self.store.snapshot()
    }

    /// Vote history, most recent first
    pub fn fetch_history(&self) -> Vec<VoteRecord> {
        self.store.history()
    }

    // ==================
    // Writes
    // ==================

    /// Apply one vote per ballot entry; partial success is allowed.
    ///
    /// A storage failure aborts the remaining entries and is returned to the
    /// caller; entries recorded before it stay recorded and are announced.
    pub async fn submit_votes(
        &self,
        ballot: VoteBallot,
        user_agent: String,
        client_ip: Option<String>,
    ) -> StoreResult<SubmitReceipt> {
        self.metrics.increment_vote_submissions();
        let entries = ballot.len();

        let (recorded, rejected, failure) = self
            .run_blocking(move |store| {
                let mut recorded = Vec::new();
                let mut rejected: usize = 0;
                for (artist_id, option) in ballot {
                    match store.cast_vote(&artist_id, &option, &user_agent, client_ip.as_deref()) {
                        Ok(VoteOutcome::Recorded) => recorded.push((artist_id, option)),
                        Ok(VoteOutcome::Rejected(_)) => rejected += 1,
                        Err(e) => return Ok((recorded, rejected, Some(e))),
                    }
                }
                Ok((recorded, rejected, None))
            })
            .await?;

        let last_update = self.store.last_update();
        for (artist_id, option) in &recorded {
            self.metrics.increment_votes_recorded();
            self.announce(
                ChangeKind::VoteAdded,
                vote_added_payload(artist_id, option, last_update),
            );
        }
        for _ in 0..rejected {
            self.metrics.increment_votes_rejected();
        }

        if let Some(e) = failure {
            self.metrics.increment_write_failures();
            error!(
                entries,
                recorded = recorded.len(),
                error = %e,
                "VOTE_SUBMISSION_FAILED"
            );
            return Err(e);
        }

        info!(entries, processed = recorded.len(), rejected, "VOTES_SUBMITTED");
        Ok(SubmitReceipt {
            processed: recorded.len(),
            rejected,
            timestamp: last_update,
        })
    }

    pub async fn add_artist(&self, artist: NewArtist) -> StoreResult<Artist> {
        let created = self
            .admin_write(move |store| store.add_artist(artist))
            .await?;
        let payload = artist_added_payload(&created, self.store.last_update());
        self.announce(ChangeKind::ArtistAdded, payload);
        Ok(created)
    }

    pub async fn delete_artist(&self, id: String) -> StoreResult<bool> {
        let target = id.clone();
        let removed = self
            .admin_write(move |store| store.delete_artist(&target))
            .await?;
        if removed {
            let payload = artist_deleted_payload(&id, self.store.last_update());
            self.announce(ChangeKind::ArtistDeleted, payload);
        }
        Ok(removed)
    }

    pub async fn set_artist_blocked(&self, id: String, blocked: bool) -> StoreResult<bool> {
        let target = id.clone();
        let found = self
            .admin_write(move |store| store.set_artist_blocked(&target, blocked))
            .await?;
        if found {
            let payload = artist_blocked_payload(&id, blocked, self.store.last_update());
            self.announce(ChangeKind::ArtistBlocked, payload);
        }
        Ok(found)
    }

    pub async fn set_global_voting(&self, enabled: bool) -> StoreResult<bool> {
        let enabled = self
            .admin_write(move |store| store.set_global_voting(enabled))
            .await?;
        let payload = global_voting_payload(enabled, self.store.last_update());
        self.announce(ChangeKind::GlobalVotingToggled, payload);
        Ok(enabled)
    }

    pub async fn reset_votes(&self) -> StoreResult<()> {
        self.admin_write(|store| store.reset_votes()).await?;
        self.announce(ChangeKind::VotesReset, reset_payload(self.store.last_update()));
        Ok(())
    }

    pub async fn force_reset(&self) -> StoreResult<()> {
        self.admin_write(|store| store.force_reset()).await?;
        self.announce(ChangeKind::StateReset, reset_payload(self.store.last_update()));
        Ok(())
    }

    // ==================
    // Internals
    // ==================

    async fn admin_write<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StateStore) -> StoreResult<T> + Send + 'static,
    {
        self.metrics.increment_admin_actions();
        let result = self.run_blocking(f).await;
        if let Err(StoreError::StorageUnavailable(_) | StoreError::Corrupted(_)) = &result {
            self.metrics.increment_write_failures();
        }
        result
    }

    async fn run_blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StateStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::unavailable(format!("store task failed: {}", e)))?
    }

    fn announce(&self, kind: ChangeKind, payload: serde_json::Value) {
        if self.bus.publish(kind, payload) > 0 {
            self.metrics.increment_events_published();
        }
    }
}
