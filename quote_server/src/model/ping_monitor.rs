//! Keep-alive tracker for snapshot subscribers.
//!
//! Presentation clients subscribe over TCP and then send `PING` datagrams from the
//! UDP socket they receive snapshots on. The monitor remembers when each subscriber
//! last pinged and reports those that went silent for longer than the timeout, which
//! the snapshot sink then stops sending to.
//!
//! Time is measured with `std::time::Instant`, which is monotonic. The monitor is not
//! synchronized; share it behind a `Mutex`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Tracks subscriber keep-alive pings and determines inactivity based on a timeout.
pub struct PingMonitor {
    /// Subscriber address -> last ping.
    clients: HashMap<SocketAddr, Instant>,
    /// Threshold after which a subscriber is considered gone.
    timeout: Duration,
}

impl PingMonitor {
    /// Create a monitor dropping subscribers silent for longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            timeout,
        }
    }

    /// Add (or refresh) a subscriber.
    pub fn register(&mut self, addr: SocketAddr) {
        self.clients.insert(addr, Instant::now());
    }

    /// Refresh a known subscriber. Pings from unknown addresses are ignored and
    /// `false` is returned.
    pub fn touch(&mut self, addr: SocketAddr) -> bool {
        match self.clients.get_mut(&addr) {
            Some(last_ping) => {
                *last_ping = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove and return every subscriber whose last ping is older than the timeout.
    pub fn check_timeouts(&mut self) -> Vec<SocketAddr> {
        let now = Instant::now();
        let timeout = self.timeout;
        let mut timed_out = Vec::new();

        self.clients.retain(|addr, last_ping| {
            if now.duration_since(*last_ping) > timeout {
                timed_out.push(*addr);
                false
            } else {
                true
            }
        });
        timed_out
    }

    /// Addresses currently subscribed.
    pub fn active_clients(&self) -> Vec<SocketAddr> {
        self.clients.keys().copied().collect()
    }

    /// Whether `addr` is currently subscribed.
    pub fn is_client_active(&self, addr: &SocketAddr) -> bool {
        self.clients.contains_key(addr)
    }
}
