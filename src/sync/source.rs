//! # Sync Seams
//!
//! Where the client gets full state from and where it hears about changes.
//! In-process implementations talk to a [`VotingService`] directly; the
//! remote ones live in [`super::remote`].

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use super::errors::SyncResult;
use crate::realtime::ChangeEvent;
use crate::service::VotingService;
use crate::store::StateSnapshot;

/// Stream of change notifications; ends or yields an error when the feed dies
pub type ChangeStream = Pin<Box<dyn Stream<Item = SyncResult<ChangeEvent>> + Send>>;

/// Full-state fetch
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch_state(&self) -> SyncResult<StateSnapshot>;
}

/// Push notification channel
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn connect(&self) -> SyncResult<ChangeStream>;
}

/// Reads state straight from an in-process service
#[derive(Debug, Clone)]
pub struct LocalSource {
    service: VotingService,
}

impl LocalSource {
    pub fn new(service: VotingService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StateSource for LocalSource {
    async fn fetch_state(&self) -> SyncResult<StateSnapshot> {
        Ok(self.service.fetch_state())
    }
}

/// Subscribes to an in-process change bus
#[derive(Debug, Clone)]
pub struct LocalFeed {
    service: VotingService,
}

impl LocalFeed {
    pub fn new(service: VotingService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ChangeFeed for LocalFeed {
    async fn connect(&self) -> SyncResult<ChangeStream> {
        let stream = self.service.subscribe().into_stream().map(Ok);
        Ok(Box::pin(stream))
    }
}
