use crate::broadcaster::Subscribers;
use crate::shutdown::Shutdown;
use log::{debug, error, info};
use quote_common::net::PING;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

/// Lightweight UDP listener that receives PING datagrams from subscribers
/// and refreshes their entry in the shared subscriber set.
pub struct UdpPingListener;

impl UdpPingListener {
    /// Read keep-alives from `socket` until shutdown. The socket's read timeout is
    /// set to `poll` so the loop notices shutdown while clients are quiet.
    pub fn run(
        socket: Arc<UdpSocket>,
        subscribers: Subscribers,
        poll: Duration,
        shutdown: &Shutdown,
    ) {
        if let Err(e) = socket.set_read_timeout(Some(poll)) {
            error!("Cannot set ping socket timeout: {}", e);
            return;
        }
        let mut buf = [0u8; 128];
        while !shutdown.is_triggered() {
            match socket.recv_from(&mut buf) {
                Ok((size, addr)) => {
                    if size >= PING.len() && &buf[..PING.len()] == PING {
                        let known = match subscribers.lock() {
                            Ok(mut monitor) => monitor.touch(addr),
                            Err(e) => {
                                error!("Subscriber list unavailable: {}", e);
                                false
                            }
                        };
                        debug!("Received ping from {} (subscribed: {})", addr, known);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => debug!("Ping socket error: {}", e),
            }
        }
        info!("Ping listener stopped");
    }
}
