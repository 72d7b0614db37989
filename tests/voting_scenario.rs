//! Voting Scenario Tests
//!
//! End-to-end behavior of the voting service on the seed roster.

use std::sync::Arc;

use livevote::realtime::{ChangeBus, ChangeKind};
use livevote::service::{VoteBallot, VotingService};
use livevote::store::{
    seed_artists, MemoryBackend, NewArtist, SharedStateStore, StoreError, VoteOption,
};

fn service() -> VotingService {
    let store = SharedStateStore::with_history_cap(Arc::new(MemoryBackend::new()), 5);
    VotingService::new(Arc::new(store), Arc::new(ChangeBus::default()))
}

fn ballot(artist_id: &str, option: &str) -> VoteBallot {
    let mut ballot = VoteBallot::new();
    ballot.insert(artist_id.to_string(), option.to_string());
    ballot
}

fn options(service: &VotingService, artist_id: &str) -> (String, String) {
    let state = service.fetch_state();
    let artist = state.artist(artist_id).unwrap();
    (artist.options[0].title.clone(), artist.options[1].title.clone())
}

#[tokio::test]
async fn test_seed_scenario() {
    let service = service();
    assert_eq!(service.fetch_state().artists.len(), 4);
    let (option_a, option_b) = options(&service, "1");

    let receipt = service
        .submit_votes(ballot("1", &option_a), "kiosk".into(), None)
        .await
        .unwrap();
    assert_eq!(receipt.processed, 1);
    assert_eq!(
        service.fetch_state().artist("1").unwrap().votes_for(&option_a),
        1
    );

    assert!(!service.set_global_voting(false).await.unwrap());

    let before = service.fetch_state();
    let receipt = service
        .submit_votes(ballot("1", &option_b), "kiosk".into(), None)
        .await
        .unwrap();
    assert_eq!(receipt.processed, 0);
    assert_eq!(receipt.rejected, 1);

    let after = service.fetch_state();
    assert_eq!(after.artists, before.artists);
    assert_eq!(after.last_update, before.last_update);
}

#[tokio::test]
async fn test_blocked_artist_rejects_votes() {
    let service = service();
    let (option_a, _) = options(&service, "2");

    assert!(service.set_artist_blocked("2".into(), true).await.unwrap());
    let receipt = service
        .submit_votes(ballot("2", &option_a), "kiosk".into(), None)
        .await
        .unwrap();
    assert_eq!(receipt.processed, 0);
    assert_eq!(service.fetch_state().artist("2").unwrap().total_votes, 0);
    assert!(service.fetch_history().is_empty());
}

#[tokio::test]
async fn test_history_is_capped_newest_first() {
    let service = service();
    let (option_a, option_b) = options(&service, "3");

    for i in 0..8 {
        let option = if i % 2 == 0 { &option_a } else { &option_b };
        service
            .submit_votes(ballot("3", option), format!("agent-{}", i), None)
            .await
            .unwrap();
    }

    let history = service.fetch_history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].user_agent, "agent-7");
    assert_eq!(history[4].user_agent, "agent-3");
}

#[tokio::test]
async fn test_reset_votes_keeps_roster() {
    let service = service();
    let (option_a, _) = options(&service, "4");
    service
        .add_artist(NewArtist {
            name: "GUEST".into(),
            time_slot: "06h00 - 07h00".into(),
            options: vec![VoteOption::new("Dub", ""), VoteOption::new("Acid", "")],
        })
        .await
        .unwrap();
    service
        .submit_votes(ballot("4", &option_a), "kiosk".into(), None)
        .await
        .unwrap();

    service.reset_votes().await.unwrap();

    let state = service.fetch_state();
    assert_eq!(state.artists.len(), 5);
    assert!(state.artists.iter().all(|a| a.total_votes == 0));
    assert!(state.artists.iter().all(|a| a.votes.values().all(|v| *v == 0)));
    assert!(service.fetch_history().is_empty());
}

#[tokio::test]
async fn test_force_reset_restores_seed() {
    let service = service();
    service.delete_artist("1".into()).await.unwrap();
    service.set_global_voting(false).await.unwrap();
    let before = service.fetch_state().last_update;

    service.force_reset().await.unwrap();

    let state = service.fetch_state();
    let seed_names: Vec<_> = seed_artists().into_iter().map(|a| a.name).collect();
    let names: Vec<_> = state.artists.iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, seed_names);
    assert!(state.artists.iter().all(|a| a.total_votes == 0));
    assert!(state.global_voting_enabled);
    assert!(state.last_update > before);
}

#[tokio::test]
async fn test_delete_unknown_artist_changes_nothing() {
    let service = service();
    let before = service.fetch_state();

    assert!(!service.delete_artist("nope".into()).await.unwrap());
    assert_eq!(service.fetch_state(), before);
}

#[tokio::test]
async fn test_invalid_artist_is_rejected_whole() {
    let service = service();
    let before = service.fetch_state();

    let result = service
        .add_artist(NewArtist {
            name: "  ".into(),
            time_slot: "late".into(),
            options: vec![VoteOption::new("A", ""), VoteOption::new("B", "")],
        })
        .await;

    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert_eq!(service.fetch_state(), before);
}

#[tokio::test]
async fn test_subscriber_sees_changes_in_order() {
    let service = service();
    let mut subscription = service.subscribe();
    let (option_a, _) = options(&service, "1");

    service
        .submit_votes(ballot("1", &option_a), "kiosk".into(), None)
        .await
        .unwrap();
    service.set_artist_blocked("1".into(), true).await.unwrap();
    service.force_reset().await.unwrap();

    let kinds = [
        subscription.recv().await.unwrap().kind,
        subscription.recv().await.unwrap().kind,
        subscription.recv().await.unwrap().kind,
    ];
    assert_eq!(
        kinds,
        [
            ChangeKind::VoteAdded,
            ChangeKind::ArtistBlocked,
            ChangeKind::StateReset
        ]
    );
}
