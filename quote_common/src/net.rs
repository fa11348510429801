//! Shared networking constants and helpers used by client and server.

/// TCP port for the command channel (client -> server).
pub const COMMAND_PORT: u16 = 8080;
/// UDP port for snapshot streaming and pings (server <-> client).
pub const DATA_PORT: u16 = 8081;
/// Keep-alive datagram payload sent by subscribed clients.
pub const PING: &[u8] = b"PING";

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
