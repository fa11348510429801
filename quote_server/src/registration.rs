//! Dynamic registration of user-requested symbols.
//!
//! `track_ticker` answers synchronously with a user-facing message and, for a new
//! symbol, kicks off a detached single-symbol fetch. That fetch is best-effort: its
//! result is only logged and never reaches the caller. In synthetic mode no fetch
//! is started; the next synthetic cycle seeds the new row instead.

use crate::feed::polling::BatchFetch;
use crate::model::mode::ModeController;
use crate::model::registry::QuoteRegistry;
use crate::model::roster::{SymbolRoster, TrackOutcome};
use log::{debug, error, info};
use std::sync::Arc;
use std::thread;

impl TrackOutcome {
    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            TrackOutcome::Invalid => "Invalid Symbol".to_string(),
            TrackOutcome::AlreadyTracked(symbol) => format!("{} is already tracked", symbol),
            TrackOutcome::Added(symbol) => format!("Added {}", symbol),
        }
    }
}

/// Entry point for tracking new symbols at runtime.
#[derive(Clone)]
pub struct Registrar {
    registry: Arc<QuoteRegistry>,
    roster: Arc<SymbolRoster>,
    mode: Arc<ModeController>,
    fetch: BatchFetch,
}

impl Registrar {
    /// Create a registrar over the shared engine state.
    pub fn new(
        registry: Arc<QuoteRegistry>,
        roster: Arc<SymbolRoster>,
        mode: Arc<ModeController>,
        fetch: BatchFetch,
    ) -> Self {
        Self {
            registry,
            roster,
            mode,
            fetch,
        }
    }

    /// Track `raw` and return the user-facing outcome immediately.
    pub fn track_ticker(&self, raw: &str) -> TrackOutcome {
        let outcome = self.roster.track_new(raw, &self.registry);
        match &outcome {
            TrackOutcome::Added(symbol) => {
                info!("Added ticker: {}", symbol);
                self.spawn_immediate_fetch(symbol.clone());
            }
            TrackOutcome::AlreadyTracked(symbol) => debug!("{} is already tracked", symbol),
            TrackOutcome::Invalid => debug!("Rejected ticker input {:?}", raw),
        }
        outcome
    }

    fn spawn_immediate_fetch(&self, symbol: String) {
        if self.mode.is_synthetic_active() {
            return;
        }
        let fetch = self.fetch.clone();
        let spawned = thread::Builder::new()
            .name(format!("fetch-{}", symbol))
            .spawn(move || match fetch.fetch_chunk(std::slice::from_ref(&symbol)) {
                Ok(updated) => debug!("Immediate fetch for {} updated {} entries", symbol, updated),
                Err(e) => debug!("Immediate fetch for {} failed: {}", symbol, e),
            });
        if let Err(e) = spawned {
            error!("Failed to spawn immediate fetch: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::polling::{QuoteFetcher, SessionCredential};
    use crate::model::registry::QuoteRecord;
    use crossbeam_channel::{Sender, unbounded};
    use quote_common::command::FeedMode;
    use quote_common::{FeedError, Result};
    use std::time::{Duration, Instant};

    struct NotifyingFetcher {
        requests: Sender<Vec<String>>,
        fail: bool,
    }

    impl QuoteFetcher for NotifyingFetcher {
        fn fetch_quotes(
            &self,
            symbols: &[String],
            _session: &SessionCredential,
        ) -> Result<Vec<QuoteRecord>> {
            let _ = self.requests.send(symbols.to_vec());
            if self.fail {
                return Err(FeedError::UpstreamStatus(500));
            }
            Ok(symbols
                .iter()
                .map(|s| QuoteRecord {
                    symbol: s.clone(),
                    price: 42.0,
                    change_percent: 0.5,
                })
                .collect())
        }
    }

    fn registrar(
        mode: FeedMode,
        fail: bool,
    ) -> (
        Registrar,
        Arc<QuoteRegistry>,
        Arc<SymbolRoster>,
        crossbeam_channel::Receiver<Vec<String>>,
    ) {
        let registry = Arc::new(QuoteRegistry::new());
        let roster = Arc::new(SymbolRoster::new(vec!["AAPL".into()], Vec::new()));
        registry.upsert_if_absent("AAPL", true);
        let (tx, rx) = unbounded();
        let fetch = BatchFetch::new(
            Arc::clone(&registry),
            Arc::new(NotifyingFetcher { requests: tx, fail }),
            Some(SessionCredential::new("crumb")),
        );
        let registrar = Registrar::new(
            Arc::clone(&registry),
            Arc::clone(&roster),
            Arc::new(ModeController::new(mode)),
            fetch,
        );
        (registrar, registry, roster, rx)
    }

    #[test]
    fn canonical_duplicates_are_detected() {
        let (registrar, _, roster, _rx) = registrar(FeedMode::Live, false);

        let first = registrar.track_ticker("  nvda ");
        assert_eq!(first.message(), "Added NVDA");
        let second = registrar.track_ticker("NVDA");
        assert_eq!(second, TrackOutcome::AlreadyTracked("NVDA".into()));
        assert_eq!(second.message(), "NVDA is already tracked");
        assert_eq!(roster.snapshot_standard(), vec!["NVDA"]);
    }

    #[test]
    fn empty_input_is_invalid_and_registers_nothing() {
        let (registrar, registry, roster, rx) = registrar(FeedMode::Live, false);

        assert_eq!(registrar.track_ticker("").message(), "Invalid Symbol");
        assert_eq!(registry.len(), 1);
        assert!(roster.snapshot_standard().is_empty());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn priority_symbols_count_as_tracked() {
        let (registrar, _, _, _rx) = registrar(FeedMode::Live, false);
        assert_eq!(
            registrar.track_ticker("aapl"),
            TrackOutcome::AlreadyTracked("AAPL".into())
        );
    }

    #[test]
    fn new_symbol_gets_immediate_single_fetch() {
        let (registrar, registry, _, rx) = registrar(FeedMode::Live, false);
        registrar.track_ticker("pltr");

        let request = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(request, vec!["PLTR".to_string()]);

        let started = Instant::now();
        while registry.get("PLTR").unwrap().price == 0.0 {
            assert!(started.elapsed() < Duration::from_secs(2));
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(registry.get("PLTR").unwrap().price, 42.0);
    }

    #[test]
    fn failed_immediate_fetch_is_not_surfaced() {
        let (registrar, registry, _, rx) = registrar(FeedMode::Live, true);
        assert_eq!(registrar.track_ticker("pltr"), TrackOutcome::Added("PLTR".into()));
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(registry.get("PLTR").unwrap().price, 0.0);
    }

    #[test]
    fn synthetic_mode_skips_network_fetch() {
        let (registrar, registry, _, rx) = registrar(FeedMode::Synthetic, false);
        registrar.track_ticker("pltr");
        assert!(registry.contains("PLTR"));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
