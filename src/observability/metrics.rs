//! Metrics registry for the voting server
//!
//! - Counters only, plus one gauge for open push feeds
//! - Reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
///
/// All counters use Relaxed ordering; exact cross-counter consistency is not needed.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    votes_recorded: AtomicU64,
    votes_rejected: AtomicU64,
    vote_submissions: AtomicU64,
    admin_actions: AtomicU64,
    write_failures: AtomicU64,
    events_published: AtomicU64,
    feeds_opened: AtomicU64,
    feeds_active: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_votes_recorded(&self) {
        self.votes_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_votes_rejected(&self) {
        self.votes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_vote_submissions(&self) {
        self.vote_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_admin_actions(&self) {
        self.admin_actions.fetch_add(1, Ordering::Relaxed);
    }

    /// A mutation failed to reach storage
    pub fn increment_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    /// A push feed connection was opened
    pub fn feed_opened(&self) {
        self.feeds_opened.fetch_add(1, Ordering::Relaxed);
        self.feeds_active.fetch_add(1, Ordering::Relaxed);
    }

    /// A push feed connection was closed
    pub fn feed_closed(&self) {
        let _ = self
            .feeds_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    pub fn votes_recorded(&self) -> u64 {
        self.votes_recorded.load(Ordering::Relaxed)
    }

    pub fn feeds_active(&self) -> u64 {
        self.feeds_active.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            votes_recorded: self.votes_recorded.load(Ordering::Relaxed),
            votes_rejected: self.votes_rejected.load(Ordering::Relaxed),
            vote_submissions: self.vote_submissions.load(Ordering::Relaxed),
            admin_actions: self.admin_actions.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            feeds_opened: self.feeds_opened.load(Ordering::Relaxed),
            feeds_active: self.feeds_active.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub votes_recorded: u64,
    pub votes_rejected: u64,
    pub vote_submissions: u64,
    pub admin_actions: u64,
    pub write_failures: u64,
    pub events_published: u64,
    pub feeds_opened: u64,
    pub feeds_active: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.votes_recorded, 0);
        assert_eq!(snapshot.feeds_active, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_votes_recorded();
        registry.increment_votes_recorded();
        registry.increment_votes_rejected();
        registry.increment_events_published();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.votes_recorded, 2);
        assert_eq!(snapshot.votes_rejected, 1);
        assert_eq!(snapshot.events_published, 1);
    }

    #[test]
    fn test_feed_gauge_never_underflows() {
        let registry = MetricsRegistry::new();
        registry.feed_opened();
        registry.feed_closed();
        registry.feed_closed();
        assert_eq!(registry.feeds_active(), 0);
        assert_eq!(registry.snapshot().feeds_opened, 1);
    }
}
