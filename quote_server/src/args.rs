//! Command-line arguments for the quote server.
use clap::Parser;
use quote_common::net::{COMMAND_PORT, DATA_PORT};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// TCP port for client commands.
    #[clap(long, default_value_t = COMMAND_PORT)]
    pub command_port: u16,

    /// UDP port snapshots are sent from and pings are received on.
    #[clap(long, default_value_t = DATA_PORT)]
    pub data_port: u16,

    /// Ticker file to track instead of the live S&P 500 constituents list.
    /// Tickers may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub tickers: Option<String>,

    /// Start with the synthetic generator instead of live data.
    #[clap(long)]
    pub synthetic: bool,

    /// Seconds between batch polling cycles.
    #[clap(long, default_value_t = 60)]
    pub poll_secs: u64,

    /// Symbols per batch request.
    #[clap(long, default_value_t = 50)]
    pub chunk_size: usize,

    /// API token for the trade stream; streaming is disabled without it.
    #[clap(long, env = "FINNHUB_TOKEN")]
    pub stream_token: Option<String>,
}
