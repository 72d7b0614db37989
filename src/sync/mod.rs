//! # Client-Side State Sync
//!
//! Reconciles a local cached copy of the voting state with the server.
//!
//! ## Architecture
//!
//! - **Cache**: one snapshot, guarded by the monotonic `last_update`
//! - **Sources**: full-state fetch and push feed seams, local or remote
//! - **Client**: the push/poll state machine

pub mod cache;
pub mod client;
pub mod errors;
pub mod remote;
pub mod source;

pub use cache::{ApplyOutcome, SyncCache};
pub use client::{SyncClient, SyncConfig, SyncHandle, SyncStatus, SyncView};
pub use errors::{SyncError, SyncResult};
pub use remote::{HttpSource, WsFeed};
pub use source::{ChangeFeed, ChangeStream, LocalFeed, LocalSource, StateSource};
