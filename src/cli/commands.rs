//! CLI command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::write_response;
use crate::http_server::{AppState, HttpServer};
use crate::observability::{init_logging, LogFormat, MetricsRegistry};
use crate::realtime::{BusConfig, ChangeBus};
use crate::service::VotingService;
use crate::store::{FileBackend, MemoryBackend, SharedStateStore, StorageBackend};
use crate::sync::{HttpSource, SyncClient, SyncConfig, SyncStatus, WsFeed};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config, force } => init(&config, force),
        Command::Serve { config, port } => serve(&config, port),
        Command::Watch {
            url,
            poll_ms,
            reconnect_ms,
        } => watch(
            &url,
            SyncConfig {
                poll_interval: Duration::from_millis(poll_ms),
                reconnect_backoff: Duration::from_millis(reconnect_ms),
                ..SyncConfig::default()
            },
        ),
    }
}

/// Write a default configuration file with a generated admin secret
pub fn init(config_path: &Path, force: bool) -> CliResult<()> {
    if config_path.exists() && !force {
        return Err(CliError::already_initialized(config_path));
    }

    let config = Config::generate();
    config.write(config_path)?;

    write_response(json!({
        "initialized": true,
        "config": config_path.to_string_lossy(),
        "admin_secret": config.admin_secret,
    }))
}

/// Build the voting service described by a configuration
pub fn build_service(config: &Config) -> CliResult<VotingService> {
    let backend: Arc<dyn StorageBackend> = match config.data_path() {
        Some(dir) => {
            let backend = FileBackend::open(&dir)?;
            info!(dir = %backend.dir().display(), "FILE_BACKEND_OPENED");
            Arc::new(backend)
        }
        None => {
            info!("MEMORY_BACKEND_OPENED");
            Arc::new(MemoryBackend::new())
        }
    };

    let store = SharedStateStore::with_history_cap(backend, config.history_cap);
    let bus = ChangeBus::new(BusConfig {
        capacity: config.bus_capacity,
        ..BusConfig::default()
    });

    Ok(VotingService::with_metrics(
        Arc::new(store),
        Arc::new(bus),
        Arc::new(MetricsRegistry::new()),
    ))
}

/// Start the voting server
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    init_logging(LogFormat::from_json_flag(config.log_json));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let service = build_service(&config)?;
        info!(
            data_dir = ?config.data_dir,
            history_cap = config.history_cap,
            last_update = service.store().last_update(),
            "STATE_STORE_OPENED"
        );

        let state = AppState::new(service, config.admin_secret.clone());
        let server = HttpServer::with_config(config.server.clone(), state);
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Follow a running server until Ctrl-C
pub fn watch(url: &str, sync_config: SyncConfig) -> CliResult<()> {
    init_logging(LogFormat::Text);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::watch_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let handle = SyncClient::spawn(HttpSource::new(url), WsFeed::new(url), sync_config);
        let mut view = handle.view();
        let mut last_seen = None;
        let mut last_status = SyncStatus::Disconnected;

        info!(%url, "WATCH_STARTED");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = view.changed() => {
                    if changed.is_err() {
                        return Err(CliError::watch_failed("sync client stopped"));
                    }
                    let current = view.borrow_and_update().clone();
                    if current.status != last_status {
                        info!(status = current.status.as_str(), "WATCH_STATUS");
                        last_status = current.status;
                    }
                    if let Some(snapshot) = current.snapshot {
                        if last_seen != Some(snapshot.last_update) {
                            last_seen = Some(snapshot.last_update);
                            let total: u64 = snapshot.artists.iter().map(|a| a.total_votes).sum();
                            info!(
                                last_update = snapshot.last_update,
                                artists = snapshot.artists.len(),
                                total_votes = total,
                                voting_open = snapshot.global_voting_enabled,
                                "WATCH_SNAPSHOT"
                            );
                        }
                    }
                }
            }
        }

        handle.shutdown().await;
        info!("WATCH_STOPPED");
        Ok(())
    })
}
