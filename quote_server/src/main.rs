//! Quote engine server.
//!
//! Wires the engine to its network boundaries:
//!
//! - Wikipedia constituents scrape (or a ticker file) for the symbol universe.
//! - Yahoo Finance session + batch fetcher for polling, Finnhub websocket for the
//!   priority tier (when a token is configured).
//! - `UdpSnapshotSink` — every broadcast tick is sent as a run of JSON frames to
//!   each subscribed client; `UdpPingListener` keeps subscriptions alive from `PING`s on
//!   the same socket.
//! - `QuoteReceiver` — TCP command port for `subscribe`, `track` and `set_mode`.
//!
//! Ctrl+C stops every loop at its next wait point and the process exits once all
//! threads are joined.
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info};
use quote_common::FeedError;
use quote_common::Result;
use quote_server::broadcaster::{LogSnapshotSink, SnapshotSink, Subscribers, UdpSnapshotSink};
use quote_server::config::{EngineConfig, PollConfig};
use quote_server::engine::{Collaborators, MarketEngine};
use quote_server::feed::finnhub::{FINNHUB_WS_URL, FinnhubTransport};
use quote_server::feed::streaming::StreamTransport;
use quote_server::feed::universe::{TickerFileUniverse, UniverseProvider};
use quote_server::feed::wikipedia::{WIKI_URL, WikipediaUniverse};
use quote_server::feed::yahoo::{self, QUOTE_URL, YahooQuoteFetcher, YahooSession};
use quote_server::model::ping_monitor::PingMonitor;
use quote_server::receiver::{CommandHandler, QuoteReceiver};
use quote_server::udp_listener::UdpPingListener;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Subscribers silent for longer than this stop receiving snapshots.
const PING_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP request timeout for session and quote requests.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Socket read timeout for the trade stream.
const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();

    let config = EngineConfig {
        poll: PollConfig {
            interval: Duration::from_secs(args.poll_secs.max(1)),
            chunk_size: args.chunk_size.max(1),
            ..PollConfig::default()
        },
        start_synthetic: args.synthetic,
        ..EngineConfig::default()
    };

    let udp_socket = Arc::new(UdpSocket::bind(format!("0.0.0.0:{}", args.data_port))?);
    info!("UDP socket created on: {}", udp_socket.local_addr()?);
    let subscribers: Subscribers = Arc::new(Mutex::new(PingMonitor::new(PING_TIMEOUT)));
    let receiver = QuoteReceiver::new(&format!("0.0.0.0:{}", args.command_port))?;

    let http = yahoo::build_client(HTTP_TIMEOUT)?;
    let universe: Box<dyn UniverseProvider> = match &args.tickers {
        Some(path) => Box::new(TickerFileUniverse::new(path)),
        None => Box::new(WikipediaUniverse::new(http.clone(), WIKI_URL)),
    };
    let transport: Option<Box<dyn StreamTransport>> = match &args.stream_token {
        Some(token) => Some(Box::new(FinnhubTransport::new(
            FINNHUB_WS_URL,
            token,
            STREAM_READ_TIMEOUT,
        ))),
        None => None,
    };
    let sinks: Vec<Box<dyn SnapshotSink>> = vec![
        Box::new(UdpSnapshotSink::new(Arc::clone(&udp_socket), Arc::clone(&subscribers))),
        Box::new(LogSnapshotSink),
    ];

    let engine = MarketEngine::start(
        config,
        Collaborators {
            universe,
            session: Box::new(YahooSession::new(http.clone())),
            fetcher: Arc::new(YahooQuoteFetcher::new(http, QUOTE_URL)),
            transport,
            sink: Box::new(sinks),
        },
    )?;

    let shutdown = engine.shutdown_signal();
    let ping_listener = {
        let shutdown = shutdown.clone();
        let subscribers = Arc::clone(&subscribers);
        thread::Builder::new()
            .name("ping-listener".into())
            .spawn(move || {
                UdpPingListener::run(udp_socket, subscribers, Duration::from_millis(500), &shutdown)
            })?
    };
    let handler = CommandHandler::new(
        engine.registrar().clone(),
        Arc::clone(engine.mode()),
        subscribers,
    );
    let command_receiver = {
        let shutdown = shutdown.clone();
        thread::Builder::new()
            .name("commands".into())
            .spawn(move || {
                if let Err(e) = receiver.receive_loop(handler, &shutdown) {
                    error!("Receiver loop failed: {}", e);
                }
            })?
    };

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| FeedError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    info!("Server is running. Press Ctrl+C to exit.");
    let _ = stop_rx.recv();
    info!("Ctrl+C received. Shutting down server...");

    engine.shutdown();
    for handle in [ping_listener, command_receiver] {
        if handle.join().is_err() {
            error!("Boundary thread panicked");
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
