//! # Change Bus
//!
//! In-process fan-out of change events to many passive subscribers.
//!
//! Delivery is at-most-once with no replay: a subscriber sees events
//! published after it subscribed, in publish order, until it is dropped.
//! A subscriber that lags past the channel capacity receives a single
//! [`ChangeKind::Resync`] event in place of the skipped ones.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{self, Stream};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::{RealtimeError, RealtimeResult};
use super::event::{ChangeEvent, ChangeKind};

/// Bus configuration
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Events buffered per subscriber before it starts lagging
    pub capacity: usize,
    /// Maximum serialized payload size in bytes
    pub max_payload_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_payload_size: 65536, // 64KB
        }
    }
}

/// Publish/subscribe channel for "state changed" notifications
#[derive(Debug)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
    sequence: AtomicU64,
    config: BusConfig,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl ChangeBus {
    pub fn new(config: BusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
            config,
        }
    }

    /// Publish an event; failures are logged and swallowed.
    ///
    /// Returns the number of subscribers the event was handed to.
    pub fn publish(&self, kind: ChangeKind, payload: Value) -> usize {
        match self.try_publish(kind, payload) {
            Ok(delivered) => delivered,
            Err(RealtimeError::NoSubscribers) => {
                debug!(kind = %kind, "CHANGE_PUBLISHED_NO_SUBSCRIBERS");
                0
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "CHANGE_PUBLISH_FAILED");
                0
            }
        }
    }

    /// Publish an event, reporting why it could not be delivered
    pub fn try_publish(&self, kind: ChangeKind, payload: Value) -> RealtimeResult<usize> {
        let payload_size = serde_json::to_vec(&payload)
            .map(|bytes| bytes.len())
            .map_err(|e| RealtimeError::InvalidMessage(e.to_string()))?;
        if payload_size > self.config.max_payload_size {
            return Err(RealtimeError::MessageTooLarge(self.config.max_payload_size));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = ChangeEvent::new(sequence, kind, payload);

        let delivered = self
            .sender
            .send(event)
            .map_err(|_| RealtimeError::NoSubscribers)?;
        debug!(kind = %kind, sequence, delivered, "CHANGE_PUBLISHED");
        Ok(delivered)
    }

    /// Start receiving events published from now on
    pub fn subscribe(&self) -> ChangeSubscription {
        let subscription = ChangeSubscription {
            id: Uuid::new_v4().to_string(),
            receiver: self.sender.subscribe(),
        };
        debug!(subscription_id = %subscription.id, "SUBSCRIPTION_OPENED");
        subscription
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sequence number of the last published event
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// A live subscription; dropping it releases it
#[derive(Debug)]
pub struct ChangeSubscription {
    id: String,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `ConnectionClosed` once the bus itself is gone.
    pub async fn recv(&mut self) -> RealtimeResult<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(subscription_id = %self.id, skipped, "SUBSCRIPTION_LAGGED");
                Ok(ChangeEvent::resync(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => Err(RealtimeError::ConnectionClosed),
        }
    }

    /// Turn the subscription into a stream that ends when the bus closes
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send + Unpin {
        Box::pin(stream::unfold(self, |mut sub| async move {
            match sub.recv().await {
                Ok(event) => Some((event, sub)),
                Err(_) => None,
            }
        }))
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        debug!(subscription_id = %self.id, "SUBSCRIPTION_RELEASED");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let bus = ChangeBus::default();
        let mut sub = bus.subscribe();

        bus.publish(ChangeKind::ArtistAdded, json!({"n": 1}));
        bus.publish(ChangeKind::VoteAdded, json!({"n": 2}));
        bus.publish(ChangeKind::VotesReset, json!({"n": 3}));

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        let third = sub.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::ArtistAdded);
        assert_eq!(second.kind, ChangeKind::VoteAdded);
        assert_eq!(third.kind, ChangeKind::VotesReset);
        assert!(first.sequence < second.sequence && second.sequence < third.sequence);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = ChangeBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(ChangeKind::GlobalVotingToggled, json!({})), 2);
        assert_eq!(a.recv().await.unwrap().kind, ChangeKind::GlobalVotingToggled);
        assert_eq!(b.recv().await.unwrap().kind, ChangeKind::GlobalVotingToggled);
    }

    #[test]
    fn test_publish_without_subscribers_is_swallowed() {
        let bus = ChangeBus::default();
        assert_eq!(bus.publish(ChangeKind::VoteAdded, json!({})), 0);
        assert!(matches!(
            bus.try_publish(ChangeKind::VoteAdded, json!({})),
            Err(RealtimeError::NoSubscribers)
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let bus = ChangeBus::default();
        let _sub = bus.subscribe();
        let large = json!({ "data": "x".repeat(100_000) });
        assert!(matches!(
            bus.try_publish(ChangeKind::VoteAdded, large.clone()),
            Err(RealtimeError::MessageTooLarge(_))
        ));
        assert_eq!(bus.publish(ChangeKind::VoteAdded, large), 0);
    }

    #[test]
    fn test_dropping_subscription_releases_it() {
        let bus = ChangeBus::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_gets_resync() {
        let bus = ChangeBus::new(BusConfig {
            capacity: 2,
            ..Default::default()
        });
        let mut sub = bus.subscribe();
        for i in 0..5 {
            bus.publish(ChangeKind::VoteAdded, json!({ "i": i }));
        }

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Resync);
        assert_eq!(event.payload["skipped"], 3);
    }

    #[tokio::test]
    async fn test_stream_ends_when_bus_dropped() {
        let bus = ChangeBus::default();
        let mut stream = bus.subscribe().into_stream();
        bus.publish(ChangeKind::StateReset, json!({}));
        drop(bus);

        assert_eq!(stream.next().await.map(|e| e.kind), Some(ChangeKind::StateReset));
        assert!(stream.next().await.is_none());
    }
}
