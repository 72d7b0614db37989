//! Remote Sync Tests
//!
//! A sync client following a real server over HTTP and WebSocket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time;

use livevote::http_server::{AppState, HttpServer};
use livevote::realtime::{ChangeBus, ChangeKind};
use livevote::service::{VoteBallot, VotingService};
use livevote::store::{MemoryBackend, SharedStateStore};
use livevote::sync::{
    ChangeFeed, HttpSource, StateSource, SyncClient, SyncConfig, SyncStatus, SyncView, WsFeed,
};

async fn start_server() -> (String, VotingService) {
    let store = SharedStateStore::open(Arc::new(MemoryBackend::new()));
    let service = VotingService::new(Arc::new(store), Arc::new(ChangeBus::default()));
    let server = HttpServer::new(AppState::new(service.clone(), "secret"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(server.serve(listener));
    (base, service)
}

async fn wait_for(
    view: &mut watch::Receiver<SyncView>,
    f: impl FnMut(&SyncView) -> bool,
) -> SyncView {
    time::timeout(Duration::from_secs(10), view.wait_for(f))
        .await
        .expect("view never reached the expected state")
        .expect("sync client stopped")
        .clone()
}

#[tokio::test]
async fn test_http_source_fetches_state() {
    let (base, service) = start_server().await;
    let snapshot = HttpSource::new(&base).fetch_state().await.unwrap();
    assert_eq!(snapshot, service.fetch_state());
}

#[tokio::test]
async fn test_ws_feed_delivers_changes() {
    let (base, service) = start_server().await;
    let mut stream = WsFeed::new(&base).connect().await.unwrap();

    // Wait until the server side has subscribed.
    time::timeout(Duration::from_secs(5), async {
        while service.bus().subscriber_count() == 0 {
            time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    service.reset_votes().await.unwrap();

    let event = time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, ChangeKind::VotesReset);
}

#[tokio::test]
async fn test_sync_client_follows_server() {
    let (base, service) = start_server().await;
    let handle = SyncClient::spawn(
        HttpSource::new(&base),
        WsFeed::new(&base),
        SyncConfig {
            poll_interval: Duration::from_millis(50),
            reconnect_backoff: Duration::from_millis(100),
            ..SyncConfig::default()
        },
    );
    let mut view = handle.view();
    let first = wait_for(&mut view, |v| {
        v.status == SyncStatus::Connected && v.snapshot.is_some()
    })
    .await;
    let first_update = first.snapshot.unwrap().last_update;

    let option = service.fetch_state().artists[2].options[0].title.clone();
    let mut ballot = VoteBallot::new();
    ballot.insert("3".to_string(), option);
    service
        .submit_votes(ballot, "remote".into(), None)
        .await
        .unwrap();

    let seen = wait_for(&mut view, |v| {
        v.snapshot
            .as_ref()
            .map(|s| s.last_update > first_update)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(seen.snapshot.unwrap().artist("3").unwrap().total_votes, 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_reports_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let handle = SyncClient::spawn(
        HttpSource::new(&base),
        WsFeed::new(&base),
        SyncConfig {
            poll_interval: Duration::from_millis(20),
            reconnect_backoff: Duration::from_millis(50),
            ..SyncConfig::default()
        },
    );

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.status(), SyncStatus::Disconnected);
    assert!(handle.snapshot().is_none());
    handle.shutdown().await;
}
