//! CLI argument definitions using clap
//!
//! Commands:
//! - livevote init --config <path>
//! - livevote serve --config <path>
//! - livevote watch --url <base>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live audience voting server
#[derive(Parser, Debug)]
#[command(name = "livevote")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./livevote.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start the voting server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./livevote.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Follow a running server and log every state change
    Watch {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Poll period in milliseconds while the push feed is down
        #[arg(long, default_value_t = 1500)]
        poll_ms: u64,

        /// Push feed retry delay in milliseconds
        #[arg(long, default_value_t = 3000)]
        reconnect_ms: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["livevote", "serve"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("./livevote.json"));
                assert_eq!(port, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_watch_intervals() {
        let cli = Cli::try_parse_from(["livevote", "watch", "--poll-ms", "500"]).unwrap();
        match cli.command {
            Command::Watch {
                poll_ms,
                reconnect_ms,
                ..
            } => {
                assert_eq!(poll_ms, 500);
                assert_eq!(reconnect_ms, 3000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
