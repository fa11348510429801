//! Engine assembly and lifecycle.
//!
//! `MarketEngine::start` acquires the session, discovers the universe, seeds the
//! registry and roster, then spawns one thread each for the broadcaster, the batch
//! poller and (when a transport is configured) the streaming source. The threads
//! share state only through the registry, the roster and the mode flag, and all of
//! them stop at their next wait point once `shutdown` is called.

use crate::broadcaster::{Broadcaster, SnapshotSink};
use crate::config::EngineConfig;
use crate::feed::polling::{BatchFetch, BatchPoller, QuoteFetcher, SessionProvider};
use crate::feed::streaming::{StreamTransport, StreamingSource};
use crate::feed::universe::{UniverseProvider, discover_universe};
use crate::model::mode::ModeController;
use crate::model::registry::QuoteRegistry;
use crate::model::roster::SymbolRoster;
use crate::model::synthetic::SyntheticGenerator;
use crate::registration::Registrar;
use crate::shutdown::{Shutdown, ShutdownTrigger};
use log::{error, info, warn};
use quote_common::Result;
use quote_common::command::FeedMode;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// External collaborators the engine is wired to.
pub struct Collaborators {
    /// Startup symbol list.
    pub universe: Box<dyn UniverseProvider>,
    /// Session handshake for the batch fetcher.
    pub session: Box<dyn SessionProvider>,
    /// Batch quote fetcher.
    pub fetcher: Arc<dyn QuoteFetcher>,
    /// Push feed for the priority tier; `None` disables streaming.
    pub transport: Option<Box<dyn StreamTransport>>,
    /// Presentation boundary.
    pub sink: Box<dyn SnapshotSink>,
}

/// Running engine.
pub struct MarketEngine {
    registry: Arc<QuoteRegistry>,
    roster: Arc<SymbolRoster>,
    mode: Arc<ModeController>,
    registrar: Registrar,
    shutdown: Shutdown,
    trigger: Option<ShutdownTrigger>,
    workers: Vec<JoinHandle<()>>,
}

impl MarketEngine {
    /// Initialize state and spawn the background loops.
    ///
    /// A session failure does not fail startup: the engine comes up in synthetic mode.
    pub fn start(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            universe,
            session,
            fetcher,
            transport,
            sink,
        } = collaborators;

        let credential = match session.acquire_session() {
            Ok(credential) => {
                info!("Authenticated with quote provider");
                Some(credential)
            }
            Err(e) => {
                warn!("Session acquisition failed ({}); defaulting to synthetic mode", e);
                None
            }
        };
        let start_mode = if config.start_synthetic || credential.is_none() {
            FeedMode::Synthetic
        } else {
            FeedMode::Live
        };
        let mode = Arc::new(ModeController::new(start_mode));
        info!("Starting in {} mode", start_mode.to_string().to_uppercase());

        let universe = discover_universe(universe.as_ref());
        let registry = Arc::new(QuoteRegistry::new());
        for symbol in &universe.priority {
            registry.upsert_if_absent(symbol, true);
        }
        for symbol in &universe.standard {
            registry.upsert_if_absent(symbol, false);
        }
        info!(
            "Tracking {} priority and {} standard symbols",
            universe.priority.len(),
            universe.standard.len()
        );
        let roster = Arc::new(SymbolRoster::new(
            universe.priority.clone(),
            universe.standard,
        ));

        let fetch = BatchFetch::new(Arc::clone(&registry), fetcher, credential);
        let registrar = Registrar::new(
            Arc::clone(&registry),
            Arc::clone(&roster),
            Arc::clone(&mode),
            fetch.clone(),
        );

        let (trigger, shutdown) = Shutdown::channel();
        let mut engine = Self {
            registry: Arc::clone(&registry),
            roster: Arc::clone(&roster),
            mode: Arc::clone(&mode),
            registrar,
            shutdown: shutdown.clone(),
            trigger: Some(trigger),
            workers: Vec::new(),
        };

        let broadcaster = Broadcaster::new(Arc::clone(&registry), sink, config.broadcast_interval);
        engine.spawn("broadcaster", move |shutdown| broadcaster.run(&shutdown))?;

        let poller = BatchPoller::new(
            Arc::clone(&roster),
            Arc::clone(&mode),
            fetch,
            SyntheticGenerator::new(config.synthetic.clone()),
            config.poll.clone(),
        );
        engine.spawn("poller", move |shutdown| poller.run(&shutdown))?;

        match transport {
            Some(transport) => {
                let source = StreamingSource::new(
                    transport,
                    Arc::clone(&registry),
                    Arc::clone(&mode),
                    universe.priority,
                    &config.stream,
                );
                engine.spawn("streaming", move |shutdown| source.run(&shutdown))?;
            }
            None => warn!("No streaming transport configured; priority tier is polled only"),
        }

        Ok(engine)
    }

    fn spawn<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce(Shutdown) + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(shutdown))?;
        self.workers.push(handle);
        Ok(())
    }

    /// Shared quote table.
    pub fn registry(&self) -> &Arc<QuoteRegistry> {
        &self.registry
    }

    /// Shared roster.
    pub fn roster(&self) -> &Arc<SymbolRoster> {
        &self.roster
    }

    /// Shared mode flag.
    pub fn mode(&self) -> &Arc<ModeController> {
        &self.mode
    }

    /// Registration entry point.
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Observer for the engine's shutdown signal, for loops owned by the caller.
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Command boundary: track a symbol and return the user-facing message.
    pub fn track_ticker(&self, raw: &str) -> String {
        self.registrar.track_ticker(raw).message()
    }

    /// Command boundary: select the data source.
    pub fn set_mode(&self, synthetic: bool) {
        self.mode.set_synthetic_active(synthetic);
    }

    /// Signal every loop to stop and wait for them.
    pub fn shutdown(mut self) {
        if let Some(trigger) = self.trigger.take() {
            trigger.trigger();
        }
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("Engine thread {} panicked", name);
            }
        }
        info!("Engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PollConfig, StreamConfig};
    use crate::feed::polling::SessionCredential;
    use crate::feed::streaming::StreamConnection;
    use crate::model::registry::QuoteRecord;
    use crossbeam_channel::{Receiver, Sender, unbounded};
    use quote_common::tickers::PRIORITY_SYMBOLS;
    use quote_common::{FeedError, Snapshot};
    use std::time::{Duration, Instant};

    struct StaticUniverse(Vec<&'static str>);

    impl UniverseProvider for StaticUniverse {
        fn discover(&self) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct FixedSession(bool);

    impl SessionProvider for FixedSession {
        fn acquire_session(&self) -> Result<SessionCredential> {
            if self.0 {
                Ok(SessionCredential::new("crumb"))
            } else {
                Err(FeedError::Session("denied".into()))
            }
        }
    }

    struct FlatFetcher;

    impl QuoteFetcher for FlatFetcher {
        fn fetch_quotes(&self, symbols: &[String], _: &SessionCredential) -> Result<Vec<QuoteRecord>> {
            Ok(symbols
                .iter()
                .map(|s| QuoteRecord {
                    symbol: s.clone(),
                    price: 10.0,
                    change_percent: 0.1,
                })
                .collect())
        }
    }

    struct ChannelSink(Sender<Snapshot>);

    impl SnapshotSink for ChannelSink {
        fn emit(&mut self, snapshot: &Snapshot) {
            let _ = self.0.send(snapshot.clone());
        }
    }

    struct NvdaTransport;

    struct NvdaConnection;

    impl StreamTransport for NvdaTransport {
        fn connect(&mut self) -> Result<Box<dyn StreamConnection>> {
            Ok(Box::new(NvdaConnection))
        }
    }

    impl StreamConnection for NvdaConnection {
        fn subscribe(&mut self, _: &str) -> Result<()> {
            Ok(())
        }

        fn read_message(&mut self) -> Result<Option<String>> {
            std::thread::sleep(Duration::from_millis(5));
            Ok(Some(r#"{"type":"trade","data":[{"s":"NVDA","p":900.0}]}"#.to_string()))
        }

        fn close(&mut self) {}
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll: PollConfig {
                interval: Duration::from_millis(30),
                chunk_size: 50,
                chunk_pause: Duration::from_millis(1),
            },
            stream: StreamConfig {
                reconnect_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(10),
                mode_poll_interval: Duration::from_millis(10),
            },
            broadcast_interval: Duration::from_millis(10),
            ..EngineConfig::default()
        }
    }

    fn start(session_ok: bool) -> (MarketEngine, Receiver<Snapshot>) {
        let (tx, rx) = unbounded();
        let engine = MarketEngine::start(
            fast_config(),
            Collaborators {
                universe: Box::new(StaticUniverse(vec!["F", "PLTR"])),
                session: Box::new(FixedSession(session_ok)),
                fetcher: Arc::new(FlatFetcher),
                transport: Some(Box::new(NvdaTransport)),
                sink: Box::new(ChannelSink(tx)),
            },
        )
        .unwrap();
        (engine, rx)
    }

    fn wait_for(rx: &Receiver<Snapshot>, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        let started = Instant::now();
        loop {
            let snapshot = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if pred(&snapshot) {
                return snapshot;
            }
            assert!(started.elapsed() < Duration::from_secs(5), "condition never met");
        }
    }

    #[test]
    fn session_failure_starts_synthetic() {
        let (engine, rx) = start(false);
        assert!(engine.mode().is_synthetic_active());
        assert_eq!(engine.registry().len(), PRIORITY_SYMBOLS.len() + 2);

        let snapshot = wait_for(&rx, |s| s.quotes.iter().all(|q| q.has_price()));
        assert!(snapshot.quotes.iter().all(|q| !q.is_live));
        assert!(snapshot.quotes[0].is_priority);
        engine.shutdown();
    }

    #[test]
    fn live_engine_streams_polls_and_tracks() {
        let (engine, rx) = start(true);
        assert!(!engine.mode().is_synthetic_active());

        let snapshot = wait_for(&rx, |s| {
            s.quotes
                .iter()
                .any(|q| q.symbol == "NVDA" && q.is_live && q.price == 900.0)
                && s.quotes.iter().any(|q| q.symbol == "F" && q.has_price())
        });
        let ford = snapshot.quotes.iter().find(|q| q.symbol == "F").unwrap();
        assert_eq!(ford.price, 10.0);
        assert_eq!(ford.change_percent, 0.1);
        assert!(!ford.is_live);

        assert_eq!(engine.track_ticker(" uber "), "Added UBER");
        assert_eq!(engine.track_ticker("UBER"), "UBER is already tracked");
        assert_eq!(engine.track_ticker(""), "Invalid Symbol");
        wait_for(&rx, |s| {
            s.quotes.iter().any(|q| q.symbol == "UBER" && q.price == 10.0)
        });
        assert_eq!(engine.roster().snapshot_standard(), vec!["F", "PLTR", "UBER"]);

        engine.set_mode(true);
        engine.set_mode(false);
        let snapshot = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(snapshot.quotes.iter().all(|q| q.has_price()));

        let started = Instant::now();
        engine.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
