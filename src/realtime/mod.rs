//! # Real-Time Change Propagation
//!
//! "State changed" notifications from the voting service to every
//! connected viewer.
//!
//! ## Architecture
//!
//! - **Events**: advisory change notifications, consumers re-fetch on each
//! - **Bus**: in-process publish/subscribe fan-out, at-most-once, no replay
//! - **Feed**: the wire protocol of the WebSocket push feed

pub mod bus;
pub mod errors;
pub mod event;
pub mod feed;

pub use bus::{BusConfig, ChangeBus, ChangeSubscription};
pub use errors::{RealtimeError, RealtimeResult};
pub use event::{ChangeEvent, ChangeKind};
pub use feed::{ClientMessage, FeedMessage};
