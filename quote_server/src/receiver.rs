use crate::broadcaster::Subscribers;
use crate::model::mode::ModeController;
use crate::registration::Registrar;
use crate::shutdown::Shutdown;
use log::{debug, error, info, warn};
use quote_common::command::Command;
use quote_common::{FeedError, Result};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the accept loop re-checks the shutdown signal while idle.
const ACCEPT_POLL: Duration = Duration::from_millis(100);
/// Read timeout for a single command line.
const COMMAND_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest accepted command line.
const MAX_COMMAND_BYTES: u64 = 4096;

/// Applies inbound commands to the engine.
#[derive(Clone)]
pub struct CommandHandler {
    registrar: Registrar,
    mode: Arc<ModeController>,
    subscribers: Subscribers,
}

impl CommandHandler {
    /// Create a handler over the engine's registrar and mode flag.
    pub fn new(registrar: Registrar, mode: Arc<ModeController>, subscribers: Subscribers) -> Self {
        Self {
            registrar,
            mode,
            subscribers,
        }
    }

    /// Apply `command` sent from `peer` and return the reply line.
    pub fn handle(&self, command: Command, peer: SocketAddr) -> Result<String> {
        match command {
            Command::Subscribe { port } => {
                let target = SocketAddr::new(peer.ip(), port);
                self.subscribers.lock()?.register(target);
                info!("Snapshot stream opened for {}", target);
                Ok(format!("Subscribed {}", target))
            }
            Command::Track { symbol } => Ok(self.registrar.track_ticker(&symbol).message()),
            Command::SetMode { mode } => {
                self.mode.set_synthetic_active(mode.is_synthetic());
                Ok(format!("Mode {}", mode))
            }
        }
    }
}

/// TCP command receiver.
///
/// Each connection carries one JSON `Command`, terminated by a newline or by EOF,
/// and gets one reply line back. Connections are served on their own threads, so a
/// slow client never holds up the accept loop; a bad one is logged and closed.
pub struct QuoteReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl QuoteReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    /// Bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Accept connections until shutdown.
    pub fn receive_loop(self, handler: CommandHandler, shutdown: &Shutdown) -> Result<()> {
        info!("Command TCP server is started on {}", self.socket.local_addr()?);

        loop {
            match self.socket.accept() {
                Ok((stream, peer)) => {
                    debug!("Command connection from {}", peer);
                    let handler = handler.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("command-{}", peer))
                        .spawn(move || {
                            if let Err(e) = serve_connection(stream, peer, &handler) {
                                warn!("Command from {} failed: {}", peer, e);
                            }
                        });
                    if let Err(e) = spawned {
                        error!("Failed to spawn command thread for {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if shutdown.wait(ACCEPT_POLL) {
                        break;
                    }
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        info!("Command receiver stopped");
        Ok(())
    }
}

fn serve_connection(mut stream: TcpStream, peer: SocketAddr, handler: &CommandHandler) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(COMMAND_READ_TIMEOUT))?;
    let mut line = String::new();
    BufReader::new(&stream)
        .take(MAX_COMMAND_BYTES)
        .read_line(&mut line)?;

    let reply = match serde_json::from_str::<Command>(line.trim_end()) {
        Ok(command) => {
            info!("Received command {:?}", command);
            handler.handle(command, peer)?
        }
        Err(e) => {
            let reply = format!("Error: {}", FeedError::from(e));
            stream.write_all(reply.as_bytes())?;
            stream.write_all(b"\n")?;
            return Err(FeedError::Format(reply));
        }
    };
    stream.write_all(reply.as_bytes())?;
    stream.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::polling::{BatchFetch, QuoteFetcher, SessionCredential};
    use crate::model::ping_monitor::PingMonitor;
    use crate::model::registry::{QuoteRecord, QuoteRegistry};
    use crate::model::roster::SymbolRoster;
    use quote_common::command::FeedMode;
    use std::net::Shutdown as SocketShutdown;
    use std::sync::Mutex;

    struct NoFetch;

    impl QuoteFetcher for NoFetch {
        fn fetch_quotes(&self, _: &[String], _: &SessionCredential) -> Result<Vec<QuoteRecord>> {
            Ok(Vec::new())
        }
    }

    fn handler() -> (CommandHandler, Arc<QuoteRegistry>, Arc<ModeController>, Subscribers) {
        let registry = Arc::new(QuoteRegistry::new());
        let roster = Arc::new(SymbolRoster::new(Vec::new(), Vec::new()));
        let mode = Arc::new(ModeController::new(FeedMode::Synthetic));
        let fetch = BatchFetch::new(Arc::clone(&registry), Arc::new(NoFetch), None);
        let registrar = Registrar::new(Arc::clone(&registry), roster, Arc::clone(&mode), fetch);
        let subscribers: Subscribers = Arc::new(Mutex::new(PingMonitor::new(Duration::from_secs(5))));
        let handler = CommandHandler::new(registrar, Arc::clone(&mode), Arc::clone(&subscribers));
        (handler, registry, mode, subscribers)
    }

    fn reply(stream: TcpStream) -> String {
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        line.trim_end().to_string()
    }

    fn send(addr: SocketAddr, payload: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(payload).unwrap();
        stream.write_all(b"\n").unwrap();
        reply(stream)
    }

    #[test]
    fn handler_applies_commands() {
        let (handler, registry, mode, subscribers) = handler();
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();

        let reply = handler
            .handle(Command::Track { symbol: " amd ".into() }, peer)
            .unwrap();
        assert_eq!(reply, "Added AMD");
        assert!(registry.contains("AMD"));

        handler
            .handle(Command::SetMode { mode: FeedMode::Live }, peer)
            .unwrap();
        assert!(!mode.is_synthetic_active());

        handler.handle(Command::Subscribe { port: 9100 }, peer).unwrap();
        let target: SocketAddr = "10.0.0.7:9100".parse().unwrap();
        assert!(subscribers.lock().unwrap().is_client_active(&target));
    }

    #[test]
    fn receiver_survives_malformed_commands() {
        let (handler, registry, _, _) = handler();
        let receiver = QuoteReceiver::new("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();
        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || receiver.receive_loop(handler, &shutdown));

        assert!(send(addr, b"{not json").starts_with("Error:"));
        assert_eq!(send(addr, br#"{"type":"track","symbol":"msft"}"#), "Added MSFT");
        assert_eq!(
            send(addr, br#"{"type":"track","symbol":"MSFT"}"#),
            "MSFT is already tracked"
        );
        assert!(registry.contains("MSFT"));

        trigger.trigger();
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn split_and_unterminated_commands_are_read_whole() {
        let (handler, registry, _, _) = handler();
        let receiver = QuoteReceiver::new("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();
        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || receiver.receive_loop(handler, &shutdown));

        let mut split = TcpStream::connect(addr).unwrap();
        split.write_all(br#"{"type":"track","#).unwrap();
        split.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        split.write_all(br#""symbol":"pltr"}"#).unwrap();
        split.write_all(b"\n").unwrap();
        assert_eq!(reply(split), "Added PLTR");

        let mut closed = TcpStream::connect(addr).unwrap();
        closed.write_all(br#"{"type":"track","symbol":"uber"}"#).unwrap();
        closed.shutdown(SocketShutdown::Write).unwrap();
        assert_eq!(reply(closed), "Added UBER");
        assert!(registry.contains("PLTR") && registry.contains("UBER"));

        trigger.trigger();
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn silent_client_does_not_stall_other_commands() {
        let (handler, _, _, _) = handler();
        let receiver = QuoteReceiver::new("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap();
        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || receiver.receive_loop(handler, &shutdown));

        let silent = TcpStream::connect(addr).unwrap();
        thread::sleep(Duration::from_millis(50));
        let started = std::time::Instant::now();
        assert_eq!(send(addr, br#"{"type":"track","symbol":"amd"}"#), "Added AMD");
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(silent);

        trigger.trigger();
        worker.join().unwrap().unwrap();
    }
}
