//! Periodic snapshot broadcast to the presentation boundary.
//!
//! The broadcaster only reads: once per tick it copies the registry and hands the
//! copy to a `SnapshotSink`. The copy is consistent per entry but is not aligned
//! with any ingestion cycle, so freshness can differ between rows.

use crate::model::ping_monitor::PingMonitor;
use crate::model::registry::QuoteRegistry;
use crate::shutdown::Shutdown;
use crossbeam_channel::{select, tick};
use log::{debug, error, info};
use quote_common::frame::MAX_FRAME_BYTES;
use quote_common::{Snapshot, SnapshotFrame};
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Presentation boundary. Fire-and-forget; failures are the sink's to log.
pub trait SnapshotSink: Send {
    /// Deliver one snapshot.
    fn emit(&mut self, snapshot: &Snapshot);
}

impl SnapshotSink for Box<dyn SnapshotSink> {
    fn emit(&mut self, snapshot: &Snapshot) {
        self.as_mut().emit(snapshot);
    }
}

impl SnapshotSink for Vec<Box<dyn SnapshotSink>> {
    fn emit(&mut self, snapshot: &Snapshot) {
        for sink in self.iter_mut() {
            sink.emit(snapshot);
        }
    }
}

/// Logs a one-line summary of each snapshot at debug level.
pub struct LogSnapshotSink;

impl SnapshotSink for LogSnapshotSink {
    fn emit(&mut self, snapshot: &Snapshot) {
        let priced = snapshot.quotes.iter().filter(|q| q.has_price()).count();
        let live = snapshot.quotes.iter().filter(|q| q.is_live).count();
        debug!(
            "Snapshot {}: {} symbols, {} priced, {} live",
            snapshot.taken_at,
            snapshot.quotes.len(),
            priced,
            live
        );
    }
}

/// Subscriber set shared by the command receiver, the ping listener and the sink.
pub type Subscribers = Arc<Mutex<PingMonitor>>;

/// Sends every snapshot to each subscribed UDP client as a run of JSON frames, one
/// datagram per frame.
pub struct UdpSnapshotSink {
    socket: Arc<UdpSocket>,
    subscribers: Subscribers,
}

impl UdpSnapshotSink {
    /// Sink over `socket` for the clients in `subscribers`.
    pub fn new(socket: Arc<UdpSocket>, subscribers: Subscribers) -> Self {
        Self {
            socket,
            subscribers,
        }
    }

    fn targets(&self) -> Vec<SocketAddr> {
        match self.subscribers.lock() {
            Ok(mut monitor) => {
                for addr in monitor.check_timeouts() {
                    info!("Subscriber {} dropped: ping timeout", addr);
                }
                monitor.active_clients()
            }
            Err(e) => {
                error!("Subscriber list unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

impl SnapshotSink for UdpSnapshotSink {
    fn emit(&mut self, snapshot: &Snapshot) {
        let targets = self.targets();
        if targets.is_empty() {
            return;
        }
        let datagrams = match encode_frames(snapshot) {
            Ok(datagrams) => datagrams,
            Err(e) => {
                error!("Failed to serialize snapshot: {}", e);
                return;
            }
        };
        for addr in targets {
            for data in &datagrams {
                if let Err(e) = self.socket.send_to(data, addr) {
                    error!("Failed to send snapshot to {}: {}", addr, e);
                    break;
                }
            }
        }
    }
}

fn encode_frames(snapshot: &Snapshot) -> quote_common::Result<Vec<Vec<u8>>> {
    SnapshotFrame::split(snapshot, MAX_FRAME_BYTES)?
        .iter()
        .map(SnapshotFrame::to_json_bytes)
        .collect()
}

/// Fixed-cadence registry reader.
pub struct Broadcaster<S: SnapshotSink> {
    registry: Arc<QuoteRegistry>,
    sink: S,
    interval: Duration,
}

impl<S: SnapshotSink> Broadcaster<S> {
    /// Broadcast `registry` to `sink` every `interval`.
    pub fn new(registry: Arc<QuoteRegistry>, sink: S, interval: Duration) -> Self {
        Self {
            registry,
            sink,
            interval,
        }
    }

    /// Take one snapshot and emit it.
    pub fn broadcast_once(&mut self) -> usize {
        let snapshot = Snapshot::new(self.registry.snapshot());
        self.sink.emit(&snapshot);
        snapshot.quotes.len()
    }

    /// Emit on every tick until shutdown.
    pub fn run(mut self, shutdown: &Shutdown) {
        info!("Broadcaster started: every {:?}", self.interval);
        let ticker = tick(self.interval);
        loop {
            select! {
                recv(shutdown.receiver()) -> _ => break,
                recv(ticker) -> _ => {
                    self.broadcast_once();
                }
            }
        }
        info!("Broadcaster stopped");
    }
}
