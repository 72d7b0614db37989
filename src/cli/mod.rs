//! CLI module
//!
//! Provides command-line interface for:
//! - init: write a default configuration file
//! - serve: run the voting server
//! - watch: follow a server with the sync client

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_service, init, run, run_command, serve, watch};
pub use config::{Config, ENV_ADMIN_SECRET, ENV_PORT};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
