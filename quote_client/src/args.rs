//! Command-line arguments for the Quote Client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use quote_common::command::FeedMode;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server IP address (IPv4 or IPv6) where the quote engine is running.
    #[clap(long, default_value = "127.0.0.1")]
    pub server_ip: String,

    /// What to do.
    #[command(subcommand)]
    pub action: Action,
}

/// Client actions.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Subscribe and render the quote table until Ctrl+C.
    Watch {
        /// Local UDP port to bind for receiving snapshots (0 picks a free port).
        #[clap(long, default_value_t = 0)]
        listen_port: u16,

        /// Render at most this many rows.
        #[clap(long, default_value_t = 40)]
        rows: usize,
    },
    /// Start tracking a symbol.
    Track {
        /// Symbol, e.g. `PLTR`.
        symbol: String,
    },
    /// Switch the engine's data source.
    Mode {
        /// `live` or `synthetic`.
        mode: FeedMode,
    },
}
