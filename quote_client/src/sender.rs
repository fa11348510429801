//! Sending commands to the quote engine.
//!
//! Commands go over a short-lived TCP connection (one JSON command line, one
//! reply line). A background thread keeps the snapshot subscription alive with `PING`
//! datagrams from the receiving UDP socket.
use log::{debug, error, info};
use quote_common::FeedError;
use quote_common::command::Command;
use quote_common::net::PING;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

/// PING interval in milliseconds used by the background thread.
const INTERVAL_MS: u64 = 2000;

/// Helper type for sending commands to the server.
pub struct CommandSender;

impl CommandSender {
    /// Send `command` to the command port at `server_addr` and return the reply line.
    pub fn send_command(server_addr: &str, command: &Command) -> Result<String, FeedError> {
        let mut stream = TcpStream::connect(server_addr)
            .map_err(|e| FeedError::Format(format!("Failed to connect to server: {}", e)))?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;

        let payload = command.to_json_bytes()?;
        info!("Sending command: {}", String::from_utf8_lossy(&payload));
        stream.write_all(&payload)?;
        stream.write_all(b"\n")?;

        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply)?;
        Ok(reply.trim_end().to_string())
    }

    /// Spawn the keep-alive loop sending `PING` to `target_addr` until `shutdown`.
    pub fn start_ping_thread(socket: Arc<UdpSocket>, target_addr: String, shutdown: Arc<AtomicBool>) {
        info!("Ping thread started. Target: {}", target_addr);
        thread::spawn(move || {
            let interval = Duration::from_millis(INTERVAL_MS);
            while !shutdown.load(Ordering::Relaxed) {
                match socket.send_to(PING, &target_addr) {
                    Ok(_) => debug!("PING sent to {}", target_addr),
                    Err(ref e) if e.kind() == ErrorKind::ConnectionReset => {}
                    Err(e) => error!("Failed to send PING: {}", e),
                }
                thread::sleep(interval);
            }
            info!("Ping thread stopping...");
        });
    }
}
