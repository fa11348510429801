//! Websocket transport for the Finnhub trade stream.
//!
//! Wire format:
//! - subscribe: `{"type":"subscribe","symbol":"AAPL"}`
//! - inbound: `{"type":"trade","data":[{"s":"AAPL","p":191.2,...}]}` or `{"type":"ping"}`
//!
//! Finnhub spells share classes with a dot (`BRK.B`); subscriptions are translated
//! from the canonical dash form, and inbound symbols are canonicalized by the reader.
//!
//! The underlying TCP socket gets a short read timeout so the reader can re-check
//! the mode flag and the shutdown signal while the market is quiet.

use crate::feed::streaming::{StreamConnection, StreamTransport};
use log::debug;
use quote_common::{FeedError, Result};
use serde_json::json;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// Default websocket endpoint.
pub const FINNHUB_WS_URL: &str = "wss://ws.finnhub.io";

/// Finnhub's spelling of a canonical symbol.
pub fn wire_symbol(symbol: &str) -> String {
    symbol.replace('-', ".")
}

/// Dials the Finnhub websocket with an API token.
pub struct FinnhubTransport {
    url: String,
    read_timeout: Duration,
}

impl FinnhubTransport {
    /// Create a transport for `token` against `base_url`.
    pub fn new(base_url: &str, token: &str, read_timeout: Duration) -> Self {
        Self {
            url: format!("{}?token={}", base_url, token),
            read_timeout,
        }
    }
}

impl StreamTransport for FinnhubTransport {
    fn connect(&mut self) -> Result<Box<dyn StreamConnection>> {
        let (socket, response) =
            tungstenite::connect(self.url.as_str()).map_err(|e| FeedError::Stream(e.to_string()))?;
        debug!("Stream handshake status: {}", response.status());

        let timeout = Some(self.read_timeout);
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout)?,
            MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(timeout)?,
            _ => {}
        }
        Ok(Box::new(FinnhubConnection { socket }))
    }
}

struct FinnhubConnection {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl StreamConnection for FinnhubConnection {
    fn subscribe(&mut self, symbol: &str) -> Result<()> {
        let frame = json!({ "type": "subscribe", "symbol": wire_symbol(symbol) }).to_string();
        self.socket
            .send(Message::text(frame))
            .map_err(|e| FeedError::Stream(e.to_string()))
    }

    fn read_message(&mut self) -> Result<Option<String>> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(text.to_string())),
            Ok(Message::Close(frame)) => Err(FeedError::Stream(format!(
                "closed by peer: {:?}",
                frame
            ))),
            // Pings are answered by tungstenite on the next read/write.
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(e) => Err(FeedError::Stream(e.to_string())),
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}
