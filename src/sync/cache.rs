//! Last-known-good state cache

use tracing::debug;

use crate::store::StateSnapshot;

/// What happened to a fetched snapshot offered to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Newer than the cached copy; now cached
    Accepted,
    /// Not newer than the cached copy; discarded
    Stale,
}

/// Single cached snapshot guarded by `last_update`.
///
/// A snapshot is accepted only when it is strictly newer than the cached
/// one, so a slow response can never roll the view back.
#[derive(Debug, Clone, Default)]
pub struct SyncCache {
    snapshot: Option<StateSnapshot>,
}

impl SyncCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, snapshot: StateSnapshot) -> ApplyOutcome {
        if let Some(cached) = &self.snapshot {
            if snapshot.last_update <= cached.last_update {
                debug!(
                    cached = cached.last_update,
                    received = snapshot.last_update,
                    "SYNC_SNAPSHOT_DISCARDED"
                );
                return ApplyOutcome::Stale;
            }
        }
        self.snapshot = Some(snapshot);
        ApplyOutcome::Accepted
    }

    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_update(&self) -> Option<i64> {
        self.snapshot.as_ref().map(|s| s.last_update)
    }
}
