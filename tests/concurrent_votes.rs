//! Concurrency Tests
//!
//! Votes for the same artist and option from many tasks at once must all
//! be counted, and readers must never observe a half-applied vote.

use std::sync::Arc;
use std::thread;

use livevote::realtime::ChangeBus;
use livevote::service::{VoteBallot, VotingService};
use livevote::store::{MemoryBackend, SharedStateStore, StateStore, VoteOutcome};

// =============================================================================
// Test Utilities
// =============================================================================

fn open_store() -> Arc<SharedStateStore> {
    Arc::new(SharedStateStore::open(Arc::new(MemoryBackend::new())))
}

fn first_option(store: &dyn StateStore, artist_id: &str) -> String {
    store.get_state().artist(artist_id).unwrap().options[0]
        .title
        .clone()
}

// =============================================================================
// Linearizable Counting
// =============================================================================

#[test]
fn test_concurrent_cast_vote_counts_every_vote() {
    const THREADS: usize = 8;
    const VOTES_PER_THREAD: usize = 25;

    let store = open_store();
    let option = first_option(store.as_ref(), "1");

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let option = option.clone();
            thread::spawn(move || {
                for _ in 0..VOTES_PER_THREAD {
                    let outcome = store
                        .cast_vote("1", &option, &format!("thread-{}", t), None)
                        .unwrap();
                    assert_eq!(outcome, VoteOutcome::Recorded);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let state = store.get_state();
    let artist = state.artist("1").unwrap();
    assert_eq!(artist.votes_for(&option), (THREADS * VOTES_PER_THREAD) as u64);
    assert_eq!(artist.total_votes, artist.votes.values().sum::<u64>());
    assert_eq!(state.vote_history.len(), store.history_cap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_through_service() {
    const SUBMISSIONS: usize = 64;

    let store = open_store();
    let option = first_option(store.as_ref(), "2");
    let service = VotingService::new(store, Arc::new(ChangeBus::default()));

    let tasks: Vec<_> = (0..SUBMISSIONS)
        .map(|i| {
            let service = service.clone();
            let option = option.clone();
            tokio::spawn(async move {
                let mut ballot = VoteBallot::new();
                ballot.insert("2".to_string(), option);
                service
                    .submit_votes(ballot, format!("voter-{}", i), None)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut timestamps = Vec::new();
    for task in tasks {
        let receipt = task.await.unwrap();
        assert_eq!(receipt.processed, 1);
        timestamps.push(receipt.timestamp);
    }

    let state = service.fetch_state();
    assert_eq!(
        state.artist("2").unwrap().votes_for(&option),
        SUBMISSIONS as u64
    );
    assert!(timestamps.iter().all(|t| *t <= state.last_update));
    assert_eq!(service.metrics().votes_recorded(), SUBMISSIONS as u64);
}

#[test]
fn test_readers_see_consistent_totals_during_writes() {
    let store = open_store();
    let option = first_option(store.as_ref(), "3");

    let writer = {
        let store = Arc::clone(&store);
        let option = option.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                store.cast_vote("3", &option, "writer", None).unwrap();
            }
        })
    };

    let mut last_seen = 0;
    while !writer.is_finished() {
        let state = store.get_state();
        for artist in &state.artists {
            assert_eq!(artist.total_votes, artist.votes.values().sum::<u64>());
        }
        assert!(state.last_update >= last_seen);
        last_seen = state.last_update;
    }
    writer.join().unwrap();

    assert_eq!(store.get_state().artist("3").unwrap().total_votes, 200);
}
