//! Quote Client — terminal stand-in for the presentation shell of the quote engine.
//!
//! `watch` subscribes to the engine's snapshot stream over UDP, keeps the
//! subscription alive with periodic `PING`s and redraws the quote table on every
//! snapshot. `track` and `mode` send a single command over TCP and print the reply.
//!
//! Usage example (CLI):
//! ```bash
//! quote_client --server-ip 192.168.0.10 watch --listen-port 55555
//! quote_client track pltr
//! quote_client mode synthetic
//! ```
#![warn(missing_docs)]
mod args;
mod render;
mod sender;

use crate::args::{Action, Args};
use crate::render::render_table;
use crate::sender::CommandSender;
use clap::Parser;
use log::{debug, error, info};
use quote_common::FeedError;
use quote_common::Result;
use quote_common::{FrameAssembler, SnapshotFrame};
use quote_common::command::Command;
use quote_common::net::{COMMAND_PORT, DATA_PORT, addr};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

/// Receive buffer size; frames are far smaller.
const MAX_DATAGRAM: usize = 65_536;

/// Runs a blocking loop that receives snapshot frames from the given UDP `socket`
/// and redraws the table whenever a snapshot is complete. Returns an error if
/// receiving fails.
fn start_receiver_loop(
    socket: Arc<UdpSocket>,
    rows: usize,
    shutdown: Arc<AtomicBool>,
) -> Result<(), FeedError> {
    info!("Snapshot receiver running on: {}", socket.local_addr()?);
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut assembler = FrameAssembler::new();

    while !shutdown.load(Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(size) => match SnapshotFrame::from_json_bytes(&buf[..size]) {
                Ok(frame) => {
                    if let Some(snapshot) = assembler.push(frame) {
                        print!("\x1B[2J\x1B[H{}", render_table(&snapshot, rows));
                    }
                }
                Err(e) => debug!("Dropping undecodable datagram: {}", e),
            },
            Err(e) => {
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut {
                    continue;
                }
                error!("Receive data error: {}", e);
                return Err(FeedError::Io(e));
            }
        }
    }
    info!("Receiver loop stopping...");
    Ok(())
}

fn watch(server_ip: &str, listen_port: u16, rows: usize) -> Result<(), FeedError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| FeedError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let socket = Arc::new(UdpSocket::bind(addr("0.0.0.0", listen_port))?);
    socket.set_read_timeout(Some(Duration::from_secs(1)))?;
    let local_port = socket.local_addr()?.port();
    info!("UDP client listening on port {}", local_port);

    let reply = CommandSender::send_command(
        &addr(server_ip, COMMAND_PORT),
        &Command::Subscribe { port: local_port },
    )?;
    info!("{}", reply);

    CommandSender::start_ping_thread(
        Arc::clone(&socket),
        addr(server_ip, DATA_PORT),
        shutdown.clone(),
    );
    start_receiver_loop(socket, rows, shutdown)
}

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();
    let server_ip = args.server_ip.trim().replace('"', "");

    match args.action {
        Action::Watch { listen_port, rows } => watch(&server_ip, listen_port, rows),
        Action::Track { symbol } => {
            let reply =
                CommandSender::send_command(&addr(&server_ip, COMMAND_PORT), &Command::Track { symbol })?;
            println!("{}", reply);
            Ok(())
        }
        Action::Mode { mode } => {
            let reply =
                CommandSender::send_command(&addr(&server_ip, COMMAND_PORT), &Command::SetMode { mode })?;
            println!("{}", reply);
            Ok(())
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
