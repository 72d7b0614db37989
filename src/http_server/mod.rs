//! # HTTP Server Module
//!
//! HTTP+JSON API for voters and the administrator, plus the WebSocket
//! change feed.
//!
//! # Endpoints
//!
//! - `/health`, `/metrics` - liveness and counters
//! - `/api/state`, `/api/history`, `/api/votes` - voter routes
//! - `/api/changes` - WebSocket change feed
//! - `/api/admin/*` - admin routes, guarded by `x-admin-secret`

pub mod admin_routes;
pub mod config;
pub mod errors;
pub mod extract;
pub mod observability_routes;
pub mod realtime_routes;
pub mod server;
pub mod vote_routes;

pub use admin_routes::ADMIN_SECRET_HEADER;
pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use extract::ApiJson;
pub use server::{AppState, HttpServer, DEFAULT_HEARTBEAT_INTERVAL};
