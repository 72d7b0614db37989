//! # State Store
//!
//! Authoritative voting state with atomic update semantics.
//!
//! ## Architecture
//!
//! - **Model**: artists, vote records, the global state blob
//! - **StateStore**: the atomic operation set, one production implementation
//! - **Backends**: key/value persistence (memory, checksummed files)
//! - **Seed**: the dataset used on first start and on force-reset

pub mod backend;
pub mod checksum;
pub mod errors;
pub mod model;
pub mod seed;
pub mod state_store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, STATE_KEY, VERSION_KEY};
pub use errors::{StoreError, StoreResult};
pub use model::{
    Artist, GlobalState, NewArtist, RejectReason, StateSnapshot, VoteOption, VoteOutcome,
    VoteRecord, DEFAULT_HISTORY_CAP, STATE_VERSION,
};
pub use seed::{seed_artists, seed_state};
pub use state_store::{SharedStateStore, StateStore};
