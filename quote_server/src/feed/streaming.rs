//! Streaming ingestion for the priority tier.
//!
//! The source cycles through `Disconnected -> Connecting -> Subscribed -> Reading`
//! and falls back to `Disconnected` on any transport failure, retrying forever after
//! a backoff delay. While synthetic mode is active it stays `Disconnected` (closing
//! an open connection at the next read) and re-checks the flag every
//! `mode_poll_interval`.
//!
//! The network side is behind `StreamTransport`/`StreamConnection`, so the state
//! machine runs unchanged against a scripted fake in tests.

use crate::config::StreamConfig;
use crate::model::mode::ModeController;
use crate::model::registry::QuoteRegistry;
use crate::shutdown::Shutdown;
use log::{debug, info, warn};
use quote_common::Result;
use quote_common::tickers::canonicalize;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;

/// Opens push connections to the streaming provider.
pub trait StreamTransport: Send {
    /// Open a new connection.
    fn connect(&mut self) -> Result<Box<dyn StreamConnection>>;
}

/// One open push connection.
pub trait StreamConnection: Send {
    /// Send a subscription request for `symbol`.
    fn subscribe(&mut self, symbol: &str) -> Result<()>;

    /// Read the next text payload. `Ok(None)` means nothing arrived within the
    /// connection's read timeout and the caller should poll again.
    fn read_message(&mut self) -> Result<Option<String>>;

    /// Close the connection. Errors are irrelevant at this point and swallowed.
    fn close(&mut self);
}

/// Connection state of the streaming source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StreamState {
    /// No connection; waiting out a backoff or held down by synthetic mode.
    Disconnected,
    /// Dialing the provider.
    Connecting,
    /// Subscription requests sent.
    Subscribed,
    /// Consuming deltas.
    Reading,
}

/// Reconnect delay. Constant when `max == base`, doubling up to `max` otherwise.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Delay that starts at `base` and doubles on each failure up to `max`.
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Same delay every time.
    pub fn constant(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Delay to wait now; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Back to `base` after a healthy connection.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// One `(symbol, price)` delta from the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeDelta {
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Trade price.
    #[serde(rename = "p")]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<TradeDelta>,
}

/// Decode a payload into trade deltas. Non-trade messages (pings, acks) yield none.
pub fn parse_deltas(payload: &str) -> Result<Vec<TradeDelta>> {
    let message: StreamMessage = serde_json::from_str(payload)?;
    if message.kind == "trade" {
        Ok(message.data)
    } else {
        Ok(Vec::new())
    }
}

enum ReadExit {
    Shutdown,
    ModeSwitched,
    Failed(quote_common::FeedError),
}

/// Reconnecting push-feed consumer for the priority tier.
pub struct StreamingSource {
    transport: Box<dyn StreamTransport>,
    registry: Arc<QuoteRegistry>,
    mode: Arc<ModeController>,
    symbols: Vec<String>,
    backoff: Backoff,
    mode_poll_interval: Duration,
    state: StreamState,
}

impl StreamingSource {
    /// Create a source streaming `symbols` into `registry`.
    pub fn new(
        transport: Box<dyn StreamTransport>,
        registry: Arc<QuoteRegistry>,
        mode: Arc<ModeController>,
        symbols: Vec<String>,
        config: &StreamConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            mode,
            symbols,
            backoff: Backoff::new(config.reconnect_backoff, config.max_backoff),
            mode_poll_interval: config.mode_poll_interval,
            state: StreamState::Disconnected,
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    fn set_state(&mut self, state: StreamState) {
        if self.state != state {
            debug!("Stream state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Apply one payload to the registry. Returns how many deltas were applied.
    ///
    /// Delta symbols are canonicalized first (`BRK.B` lands on `BRK-B`). Malformed
    /// payloads are logged and dropped; unknown symbols are skipped by the registry.
    pub fn apply_payload(&self, payload: &str) -> usize {
        match parse_deltas(payload) {
            Ok(deltas) => deltas
                .iter()
                .filter(|d| {
                    canonicalize(&d.symbol)
                        .is_some_and(|symbol| self.registry.apply_streaming_update(&symbol, d.price))
                })
                .count(),
            Err(e) => {
                debug!("Dropping malformed stream payload: {}", e);
                0
            }
        }
    }

    /// Run until shutdown.
    pub fn run(mut self, shutdown: &Shutdown) {
        info!("Streaming source started for {} symbols", self.symbols.len());
        loop {
            if shutdown.is_triggered() {
                break;
            }
            if self.mode.is_synthetic_active() {
                self.set_state(StreamState::Disconnected);
                if shutdown.wait(self.mode_poll_interval) {
                    break;
                }
                continue;
            }

            self.set_state(StreamState::Connecting);
            let mut conn = match self.transport.connect() {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Stream connect failed: {}", e);
                    if self.back_off(shutdown) {
                        break;
                    }
                    continue;
                }
            };

            if let Err(e) = self.subscribe_all(conn.as_mut()) {
                warn!("Stream subscribe failed: {}", e);
                conn.close();
                if self.back_off(shutdown) {
                    break;
                }
                continue;
            }
            self.set_state(StreamState::Subscribed);
            self.backoff.reset();
            info!("Stream subscribed to {} symbols", self.symbols.len());

            self.set_state(StreamState::Reading);
            let exit = self.read_loop(conn.as_mut(), shutdown);
            conn.close();
            self.set_state(StreamState::Disconnected);

            match exit {
                ReadExit::Shutdown => break,
                ReadExit::ModeSwitched => info!("Stream closed: synthetic mode active"),
                ReadExit::Failed(e) => {
                    warn!("Stream read failed: {}", e);
                    if self.back_off(shutdown) {
                        break;
                    }
                }
            }
        }
        self.set_state(StreamState::Disconnected);
        info!("Streaming source stopped");
    }

    fn subscribe_all(&self, conn: &mut dyn StreamConnection) -> Result<()> {
        for symbol in &self.symbols {
            conn.subscribe(symbol)?;
        }
        Ok(())
    }

    fn read_loop(&self, conn: &mut dyn StreamConnection, shutdown: &Shutdown) -> ReadExit {
        loop {
            if shutdown.is_triggered() {
                return ReadExit::Shutdown;
            }
            if self.mode.is_synthetic_active() {
                return ReadExit::ModeSwitched;
            }
            match conn.read_message() {
                Ok(Some(payload)) => {
                    self.apply_payload(&payload);
                }
                Ok(None) => {}
                Err(e) => return ReadExit::Failed(e),
            }
        }
    }

    /// Wait out the backoff. Returns `true` if shutdown fired meanwhile.
    fn back_off(&mut self, shutdown: &Shutdown) -> bool {
        self.set_state(StreamState::Disconnected);
        let delay = self.backoff.next_delay();
        debug!("Reconnecting stream in {:?}", delay);
        shutdown.wait(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, Sender, unbounded};
    use quote_common::FeedError;
    use quote_common::command::FeedMode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    /// Scripted reads for one connection; `Err` entries end the connection.
    type Script = VecDeque<Result<Option<String>>>;

    #[derive(Default)]
    struct Probe {
        connects: AtomicUsize,
        subscriptions: Mutex<Vec<String>>,
        open: AtomicBool,
    }

    struct FakeTransport {
        scripts: Receiver<Script>,
        probe: Arc<Probe>,
        fail_connect: bool,
    }

    struct FakeConnection {
        script: Script,
        probe: Arc<Probe>,
    }

    impl StreamTransport for FakeTransport {
        fn connect(&mut self) -> Result<Box<dyn StreamConnection>> {
            self.probe.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connect {
                return Err(FeedError::Stream("refused".into()));
            }
            let script = self.scripts.try_recv().unwrap_or_default();
            self.probe.open.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeConnection {
                script,
                probe: Arc::clone(&self.probe),
            }))
        }
    }

    impl StreamConnection for FakeConnection {
        fn subscribe(&mut self, symbol: &str) -> Result<()> {
            self.probe.subscriptions.lock().unwrap().push(symbol.to_string());
            Ok(())
        }

        fn read_message(&mut self) -> Result<Option<String>> {
            match self.script.pop_front() {
                Some(step) => step,
                None => {
                    thread::sleep(Duration::from_millis(2));
                    Ok(None)
                }
            }
        }

        fn close(&mut self) {
            self.probe.open.store(false, Ordering::SeqCst);
        }
    }

    struct Harness {
        registry: Arc<QuoteRegistry>,
        mode: Arc<ModeController>,
        probe: Arc<Probe>,
        scripts: Sender<Script>,
    }

    fn config() -> StreamConfig {
        StreamConfig {
            reconnect_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(10),
            mode_poll_interval: Duration::from_millis(10),
        }
    }

    fn start(fail_connect: bool, mode: FeedMode) -> (Harness, StreamingSource) {
        let registry = Arc::new(QuoteRegistry::new());
        registry.upsert_if_absent("AAPL", true);
        registry.upsert_if_absent("NVDA", true);
        let mode = Arc::new(ModeController::new(mode));
        let probe = Arc::new(Probe::default());
        let (scripts_tx, scripts_rx) = unbounded();
        let transport = FakeTransport {
            scripts: scripts_rx,
            probe: Arc::clone(&probe),
            fail_connect,
        };
        let source = StreamingSource::new(
            Box::new(transport),
            Arc::clone(&registry),
            Arc::clone(&mode),
            vec!["AAPL".into(), "NVDA".into()],
            &config(),
        );
        let harness = Harness {
            registry,
            mode,
            probe,
            scripts: scripts_tx,
        };
        (harness, source)
    }

    fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
        let started = Instant::now();
        while started.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn text(s: &str) -> Result<Option<String>> {
        Ok(Some(s.to_string()))
    }

    #[test]
    fn parse_deltas_ignores_non_trade_messages() {
        assert!(parse_deltas(r#"{"type":"ping"}"#).unwrap().is_empty());
        let deltas = parse_deltas(r#"{"type":"trade","data":[{"s":"AAPL","p":191.5,"v":3}]}"#)
            .unwrap();
        assert_eq!(
            deltas,
            vec![TradeDelta {
                symbol: "AAPL".into(),
                price: 191.5
            }]
        );
        assert!(parse_deltas("not json").is_err());
    }

    #[test]
    fn backoff_constant_and_doubling() {
        let mut constant = Backoff::constant(Duration::from_secs(5));
        assert_eq!(constant.next_delay(), Duration::from_secs(5));
        assert_eq!(constant.next_delay(), Duration::from_secs(5));

        let mut growing = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        let delays: Vec<u64> = (0..5).map(|_| growing.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        growing.reset();
        assert_eq!(growing.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn dotted_share_classes_land_on_canonical_symbols() {
        let (h, source) = start(false, FeedMode::Live);
        h.registry.upsert_if_absent("BRK-B", true);

        let applied = source.apply_payload(r#"{"type":"trade","data":[{"s":"BRK.B","p":412.5}]}"#);
        assert_eq!(applied, 1);
        let brk = h.registry.get("BRK-B").unwrap();
        assert_eq!(brk.price, 412.5);
        assert!(brk.is_live);
        assert!(h.registry.get("BRK.B").is_none());
    }

    #[test]
    fn applies_trades_and_survives_malformed_payloads() {
        let (h, source) = start(false, FeedMode::Live);
        h.scripts
            .send(VecDeque::from(vec![
                text("{garbage"),
                text(r#"{"type":"trade","data":[{"s":"AAPL","p":190.25},{"s":"ZZZZ","p":1.0}]}"#),
                text(r#"{"type":"trade","data":[{"s":"NVDA","p":880.0}]}"#),
            ]))
            .unwrap();

        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || source.run(&shutdown));

        let registry = Arc::clone(&h.registry);
        assert!(wait_until(Duration::from_secs(2), || {
            registry.get("NVDA").map(|q| q.is_live).unwrap_or(false)
        }));
        let aapl = h.registry.get("AAPL").unwrap();
        assert_eq!(aapl.price, 190.25);
        assert!(aapl.is_live);
        assert_eq!(aapl.change_percent, 0.0);
        assert!(h.registry.get("ZZZZ").is_none());
        assert_eq!(h.probe.connects.load(Ordering::SeqCst), 1);
        assert_eq!(
            *h.probe.subscriptions.lock().unwrap(),
            vec!["AAPL".to_string(), "NVDA".to_string()]
        );

        trigger.trigger();
        worker.join().unwrap();
        assert!(!h.probe.open.load(Ordering::SeqCst));
    }

    #[test]
    fn read_failure_reconnects_after_backoff() {
        let (h, source) = start(false, FeedMode::Live);
        h.scripts
            .send(VecDeque::from(vec![Err(FeedError::Stream("reset".into()))]))
            .unwrap();
        h.scripts
            .send(VecDeque::from(vec![text(
                r#"{"type":"trade","data":[{"s":"AAPL","p":200.0}]}"#,
            )]))
            .unwrap();

        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || source.run(&shutdown));

        let registry = Arc::clone(&h.registry);
        assert!(wait_until(Duration::from_secs(2), || {
            registry.get("AAPL").map(|q| q.price == 200.0).unwrap_or(false)
        }));
        assert_eq!(h.probe.connects.load(Ordering::SeqCst), 2);

        trigger.trigger();
        worker.join().unwrap();
    }

    #[test]
    fn connect_failures_retry_until_shutdown() {
        let (h, source) = start(true, FeedMode::Live);
        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || source.run(&shutdown));

        let probe = Arc::clone(&h.probe);
        assert!(wait_until(Duration::from_secs(2), || {
            probe.connects.load(Ordering::SeqCst) >= 3
        }));
        trigger.trigger();
        worker.join().unwrap();
    }

    #[test]
    fn synthetic_mode_holds_stream_disconnected() {
        let (h, source) = start(false, FeedMode::Synthetic);
        let (trigger, shutdown) = Shutdown::channel();
        let worker = thread::spawn(move || source.run(&shutdown));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(h.probe.connects.load(Ordering::SeqCst), 0);

        h.mode.set_synthetic_active(false);
        let probe = Arc::clone(&h.probe);
        assert!(wait_until(Duration::from_secs(2), || probe.open.load(Ordering::SeqCst)));

        // Closed within one poll interval plus a read, never left open.
        h.mode.set_synthetic_active(true);
        let probe = Arc::clone(&h.probe);
        assert!(wait_until(Duration::from_millis(500), || {
            !probe.open.load(Ordering::SeqCst)
        }));
        let connects = h.probe.connects.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(h.probe.connects.load(Ordering::SeqCst), connects);

        trigger.trigger();
        worker.join().unwrap();
    }
}
