//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::admin_routes::admin_routes;
use super::config::HttpServerConfig;
use super::observability_routes::observability_routes;
use super::realtime_routes::realtime_routes;
use super::vote_routes::vote_routes;
use crate::service::VotingService;

/// Default period between server heartbeats on the push feed
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: VotingService,
    pub admin_secret: String,
    pub heartbeat_interval: Duration,
}

impl AppState {
    pub fn new(service: VotingService, admin_secret: impl Into<String>) -> Self {
        Self {
            service,
            admin_secret: admin_secret.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// HTTP server for the voting API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with default configuration
    pub fn new(state: AppState) -> Self {
        Self::with_config(HttpServerConfig::default(), state)
    }

    /// Create a new HTTP server with custom configuration
    pub fn with_config(config: HttpServerConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, Arc::new(state));
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, state: Arc<AppState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            // /health and /metrics at root level
            .merge(observability_routes(state.clone()))
            .nest(
                "/api",
                vote_routes(state.clone()).merge(realtime_routes(state.clone())),
            )
            .nest("/api/admin", admin_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        info!(%addr, "SERVER_LISTENING");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("SERVER_STOPPED");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("SHUTDOWN_SIGNAL_RECEIVED");
}
