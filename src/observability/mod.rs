//! Observability for the voting server
//!
//! - Structured logging through `tracing`; log messages are upper-snake
//!   event names with the details carried as fields
//! - Operational counters in [`MetricsRegistry`]
//!
//! # Usage
//!
//! ```ignore
//! use livevote::observability::{init_logging, LogFormat};
//!
//! init_logging(LogFormat::Json);
//! tracing::info!(port = 8080, "SERVER_LISTENING");
//! ```

mod metrics;

pub use metrics::{MetricsRegistry, MetricsSnapshot};

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "livevote=info,tower_http=info";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = match format {
        LogFormat::Text => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };

    if result.is_err() {
        tracing::debug!("LOGGING_ALREADY_INITIALIZED");
    }
}
