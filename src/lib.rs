//! livevote - live audience voting with real-time state synchronization
//!
//! Many concurrent voters, one administrator, and any number of passive
//! viewers share one authoritative voting state.
//!
//! - [`store`]: the authoritative state and its atomic operations
//! - [`realtime`]: change notifications and the push feed protocol
//! - [`service`]: the server-side facade that mutates and announces
//! - [`sync`]: the client-side cache kept current by push and poll
//! - [`http_server`]: the HTTP+JSON and WebSocket surface
//! - [`cli`]: `init`, `serve` and `watch`

pub mod cli;
pub mod http_server;
pub mod observability;
pub mod realtime;
pub mod service;
pub mod store;
pub mod sync;
