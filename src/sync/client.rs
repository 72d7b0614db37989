//! # Sync Client
//!
//! Keeps one cached copy of the voting state current on the client side.
//!
//! The client is a single task driving one state machine:
//!
//! - **Disconnected**: initial state, or the last fetch failed
//! - **Connected**: push feed is up; every burst of changes triggers a full fetch
//! - **Reconnecting**: push feed is down; poll on a short interval and retry
//!   the feed on a fixed backoff
//!
//! Polling never stops while the feed is down, including while a connect
//! attempt is pending. Every fetched snapshot goes through
//! [`SyncCache::apply`], so the view never moves backwards. Observers read
//! the view through a `tokio::sync::watch` channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::cache::{ApplyOutcome, SyncCache};
use super::errors::{SyncError, SyncResult};
use super::source::{ChangeFeed, ChangeStream, StateSource};
use crate::store::StateSnapshot;

/// Connection state reported to observers.
///
/// A failed fetch always reports `Disconnected`, even while the push feed is
/// up; the next successful fetch restores `Connected` or `Reconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Disconnected,
    Connected,
    Reconnecting,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Disconnected => "disconnected",
            SyncStatus::Connected => "connected",
            SyncStatus::Reconnecting => "reconnecting",
        }
    }
}

/// What observers see
#[derive(Debug, Clone, PartialEq)]
pub struct SyncView {
    /// Last accepted snapshot, kept across failures
    pub snapshot: Option<StateSnapshot>,
    pub status: SyncStatus,
}

/// Timing knobs
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Poll period while the push feed is down
    pub poll_interval: Duration,
    /// Delay before retrying the push feed
    pub reconnect_backoff: Duration,
    /// A connect attempt still pending after this long counts as failed
    pub connect_timeout: Duration,
    /// Feed considered dead after this long without a frame
    pub feed_idle_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            reconnect_backoff: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
            feed_idle_timeout: Duration::from_secs(45),
        }
    }
}

/// Client-side reconciliation loop
pub struct SyncClient<S, F> {
    source: S,
    feed: Arc<F>,
    config: SyncConfig,
    cache: SyncCache,
    status: SyncStatus,
    feed_up: bool,
    view_tx: watch::Sender<SyncView>,
}

impl<S, F> SyncClient<S, F>
where
    S: StateSource + 'static,
    F: ChangeFeed + 'static,
{
    /// Start the loop on the current runtime
    pub fn spawn(source: S, feed: F, config: SyncConfig) -> SyncHandle {
        let (view_tx, view_rx) = watch::channel(SyncView {
            snapshot: None,
            status: SyncStatus::Disconnected,
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let client = SyncClient {
            source,
            feed: Arc::new(feed),
            config,
            cache: SyncCache::new(),
            status: SyncStatus::Disconnected,
            feed_up: false,
            view_tx,
        };
        let task = tokio::spawn(client.run(shutdown_rx));

        SyncHandle {
            view: view_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        info!("SYNC_STARTED");

        tokio::select! {
            _ = &mut shutdown => {
                info!("SYNC_STOPPED");
                return;
            }
            _ = self.refresh() => {}
        }

        loop {
            let connected = tokio::select! {
                _ = &mut shutdown => break,
                result = self.connect_while_polling() => result,
            };

            match connected {
                Ok(mut stream) => {
                    // Subscribed before this fetch, so no change slips in between.
                    self.feed_up = true;
                    self.set_status(SyncStatus::Connected);
                    self.refresh().await;

                    let lost = tokio::select! {
                        _ = &mut shutdown => break,
                        err = self.follow(&mut stream) => err,
                    };
                    self.feed_up = false;
                    warn!(error = %lost, "SYNC_FEED_LOST");
                }
                Err(e) => warn!(error = %e, "SYNC_FEED_CONNECT_FAILED"),
            }

            if self.status != SyncStatus::Disconnected {
                self.set_status(SyncStatus::Reconnecting);
            }

            let stop = tokio::select! {
                _ = &mut shutdown => true,
                _ = self.poll_until_retry() => false,
            };
            if stop {
                break;
            }
        }
        info!("SYNC_STOPPED");
    }

    fn poll_ticker(&self) -> Interval {
        let mut ticker = time::interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// One push connect attempt, polling the source while it is pending
    async fn connect_while_polling(&mut self) -> SyncResult<ChangeStream> {
        let feed = Arc::clone(&self.feed);
        let limit = self.config.connect_timeout;
        let attempt = time::timeout(limit, async move { feed.connect().await });
        tokio::pin!(attempt);

        let mut ticker = self.poll_ticker();
        loop {
            tokio::select! {
                result = &mut attempt => {
                    return result.unwrap_or_else(|_| {
                        Err(SyncError::FeedUnavailable(format!(
                            "connect timed out after {} ms",
                            limit.as_millis()
                        )))
                    });
                }
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }

    /// Re-fetch on every burst of changes until the feed fails
    async fn follow(&mut self, stream: &mut ChangeStream) -> SyncError {
        let idle = self.config.feed_idle_timeout;
        loop {
            match time::timeout(idle, stream.next()).await {
                Err(_) => return SyncError::FeedIdle(idle.as_millis() as u64),
                Ok(None) => return SyncError::FeedClosed,
                Ok(Some(Err(e))) => return e,
                Ok(Some(Ok(event))) => {
                    let (coalesced, ended) = drain_ready(stream);
                    debug!(
                        kind = %event.kind,
                        sequence = event.sequence,
                        coalesced,
                        "SYNC_CHANGE_RECEIVED"
                    );
                    self.refresh().await;
                    if let Some(e) = ended {
                        return e;
                    }
                }
            }
        }
    }

    /// Poll the source until the reconnect backoff has elapsed
    async fn poll_until_retry(&mut self) {
        let retry_at = Instant::now() + self.config.reconnect_backoff;
        let mut ticker = self.poll_ticker();

        loop {
            tokio::select! {
                _ = time::sleep_until(retry_at) => return,
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }

    async fn refresh(&mut self) {
        match self.source.fetch_state().await {
            Ok(snapshot) => {
                let previous = self.cache.last_update();
                let last_update = snapshot.last_update;
                if self.cache.apply(snapshot) == ApplyOutcome::Accepted {
                    debug!(?previous, last_update, "SYNC_SNAPSHOT_ACCEPTED");
                    self.publish();
                }
                self.set_status(if self.feed_up {
                    SyncStatus::Connected
                } else {
                    SyncStatus::Reconnecting
                });
            }
            Err(e) => {
                warn!(error = %e, "SYNC_FETCH_FAILED");
                self.set_status(SyncStatus::Disconnected);
            }
        }
    }

    fn set_status(&mut self, status: SyncStatus) {
        if self.status != status {
            info!(from = self.status.as_str(), to = status.as_str(), "SYNC_STATUS_CHANGED");
            self.status = status;
            self.publish();
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(SyncView {
            snapshot: self.cache.snapshot().cloned(),
            status: self.status,
        });
    }
}

/// Consume events that are already queued; one fetch covers all of them.
///
/// Returns how many were consumed and the error if the feed ended meanwhile.
fn drain_ready(stream: &mut ChangeStream) -> (usize, Option<SyncError>) {
    let mut coalesced = 0;
    while let Some(next) = stream.next().now_or_never() {
        match next {
            Some(Ok(_)) => coalesced += 1,
            Some(Err(e)) => return (coalesced, Some(e)),
            None => return (coalesced, Some(SyncError::FeedClosed)),
        }
    }
    (coalesced, None)
}

/// Owner handle of a running [`SyncClient`].
///
/// Dropping it stops the client.
#[derive(Debug)]
pub struct SyncHandle {
    view: watch::Receiver<SyncView>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// A receiver that is notified on every view change
    pub fn view(&self) -> watch::Receiver<SyncView> {
        self.view.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.view.borrow().status
    }

    pub fn snapshot(&self) -> Option<StateSnapshot> {
        self.view.borrow().snapshot.clone()
    }

    /// Stop the loop and wait for it to release the feed
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "SYNC_TASK_FAILED");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
