//! Remote sync seams: HTTP for full state, WebSocket for the push feed.

use async_trait::async_trait;
use futures_util::{future, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

use super::errors::{SyncError, SyncResult};
use super::source::{ChangeFeed, ChangeStream, StateSource};
use crate::realtime::FeedMessage;
use crate::store::StateSnapshot;

const STATE_PATH: &str = "/api/state";
const CHANGES_PATH: &str = "/api/changes";

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Fetches `GET /api/state` from a voting server
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", trim_base(base_url), STATE_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StateSource for HttpSource {
    async fn fetch_state(&self) -> SyncResult<StateSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .header("Cache-Control", "no-cache")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<StateSnapshot>().await?)
    }
}

/// Subscribes to `GET /api/changes` over WebSocket
#[derive(Debug, Clone)]
pub struct WsFeed {
    url: String,
}

impl WsFeed {
    /// `base_url` is the server root; `http` schemes become `ws`
    pub fn new(base_url: &str) -> Self {
        let base = trim_base(base_url);
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base
        };
        Self {
            url: format!("{}{}", base, CHANGES_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Map one feed frame to a stream item; control frames are skipped
fn frame_to_item(message: Message) -> Option<SyncResult<crate::realtime::ChangeEvent>> {
    match message {
        Message::Text(text) => match FeedMessage::decode(&text) {
            Ok(FeedMessage::Change { event }) => Some(Ok(event)),
            Ok(FeedMessage::Connected { connection_id, .. }) => {
                debug!(%connection_id, "SYNC_FEED_HELLO");
                None
            }
            Ok(FeedMessage::Heartbeat { .. }) => None,
            Ok(FeedMessage::Error { message, code }) => {
                Some(Err(SyncError::FeedError { code, message }))
            }
            Err(e) => Some(Err(SyncError::InvalidResponse(e.to_string()))),
        },
        Message::Close(_) => Some(Err(SyncError::FeedClosed)),
        _ => None,
    }
}

#[async_trait]
impl ChangeFeed for WsFeed {
    async fn connect(&self) -> SyncResult<ChangeStream> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, "SYNC_FEED_CONNECTED");

        let stream = socket.filter_map(|frame| {
            future::ready(match frame {
                Ok(message) => frame_to_item(message),
                Err(e) => Some(Err(SyncError::from(e))),
            })
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{ChangeEvent, ChangeKind};

    #[test]
    fn test_urls_from_base() {
        assert_eq!(
            HttpSource::new("http://localhost:8080/").url(),
            "http://localhost:8080/api/state"
        );
        assert_eq!(
            WsFeed::new("http://localhost:8080").url(),
            "ws://localhost:8080/api/changes"
        );
        assert_eq!(
            WsFeed::new("https://vote.example.org").url(),
            "wss://vote.example.org/api/changes"
        );
    }

    #[test]
    fn test_change_frame_becomes_event() {
        let event = ChangeEvent::new(1, ChangeKind::VoteAdded, serde_json::json!({}));
        let text = FeedMessage::Change {
            event: event.clone(),
        }
        .encode()
        .unwrap();

        let item = frame_to_item(Message::Text(text)).unwrap().unwrap();
        assert_eq!(item, event);
    }

    #[test]
    fn test_control_frames_are_skipped() {
        let hb = FeedMessage::heartbeat(None).encode().unwrap();
        assert!(frame_to_item(Message::Text(hb)).is_none());
        assert!(frame_to_item(Message::Ping(vec![1])).is_none());
    }

    #[test]
    fn test_close_and_error_frames_end_the_feed() {
        assert_eq!(
            frame_to_item(Message::Close(None)).unwrap(),
            Err(SyncError::FeedClosed)
        );
        let err = FeedMessage::Error {
            message: "bye".into(),
            code: 1011,
        }
        .encode()
        .unwrap();
        assert!(matches!(
            frame_to_item(Message::Text(err)).unwrap(),
            Err(SyncError::FeedError { code: 1011, .. })
        ));
    }
}
