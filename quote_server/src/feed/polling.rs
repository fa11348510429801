//! Batch polling for every tracked symbol.
//!
//! Each cycle copies the roster (standard tier plus the priority tier, which the
//! stream does not give change percent for), splits it into fixed-size chunks and
//! fetches them one after another, pausing after every chunk. A failed chunk is
//! logged and skipped; the cycle always runs to the end.
//!
//! While synthetic mode is active a cycle runs the synthetic generator instead and
//! performs no network I/O. A symbol tracked while a cycle is in flight is missing
//! from that cycle's roster copy and is picked up by the next one.

use crate::config::PollConfig;
use crate::model::mode::ModeController;
use crate::model::registry::{QuoteRecord, QuoteRegistry};
use crate::model::roster::SymbolRoster;
use crate::model::synthetic::SyntheticGenerator;
use crate::shutdown::Shutdown;
use crossbeam_channel::{select, tick};
use log::{debug, error, info, warn};
use quote_common::{FeedError, Result};
use std::fmt;
use std::sync::Arc;

/// Opaque session token the fetch collaborator attaches to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(..)")
    }
}

/// Acquires the session credential once at startup.
pub trait SessionProvider {
    /// Perform the handshake.
    fn acquire_session(&self) -> Result<SessionCredential>;
}

/// Fetches quote snapshots for a list of symbols in one request.
pub trait QuoteFetcher: Send + Sync {
    /// Fetch quotes for `symbols`. Records for unknown symbols may be returned; the
    /// registry ignores them.
    fn fetch_quotes(
        &self,
        symbols: &[String],
        session: &SessionCredential,
    ) -> Result<Vec<QuoteRecord>>;
}

/// Single-request fetch into the registry, shared by the poller and by ad-hoc
/// fetches for newly tracked symbols.
#[derive(Clone)]
pub struct BatchFetch {
    registry: Arc<QuoteRegistry>,
    fetcher: Arc<dyn QuoteFetcher>,
    session: Option<SessionCredential>,
}

impl BatchFetch {
    /// Create a fetch handle. `session` is `None` when acquisition failed.
    pub fn new(
        registry: Arc<QuoteRegistry>,
        fetcher: Arc<dyn QuoteFetcher>,
        session: Option<SessionCredential>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            session,
        }
    }

    /// Whether a session credential is available.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Fetch one chunk and apply it. Returns the number of entries updated.
    pub fn fetch_chunk(&self, symbols: &[String]) -> Result<usize> {
        if symbols.is_empty() {
            return Ok(0);
        }
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| FeedError::Session("no session credential".into()))?;
        let records = self.fetcher.fetch_quotes(symbols, session)?;
        Ok(self.registry.apply_batch_records(&records))
    }
}

/// Outcome of one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The synthetic generator ran instead of the network fetch.
    pub synthetic: bool,
    /// Chunks requested.
    pub chunks: usize,
    /// Chunks whose request failed.
    pub failed_chunks: usize,
    /// Registry entries updated.
    pub updated: usize,
}

/// Periodic batch poller.
pub struct BatchPoller {
    roster: Arc<SymbolRoster>,
    mode: Arc<ModeController>,
    fetch: BatchFetch,
    generator: SyntheticGenerator,
    config: PollConfig,
}

impl BatchPoller {
    /// Create a poller.
    pub fn new(
        roster: Arc<SymbolRoster>,
        mode: Arc<ModeController>,
        fetch: BatchFetch,
        generator: SyntheticGenerator,
        config: PollConfig,
    ) -> Self {
        Self {
            roster,
            mode,
            fetch,
            generator,
            config,
        }
    }

    /// Run one cycle immediately, then one per interval until shutdown.
    pub fn run(&self, shutdown: &Shutdown) {
        info!(
            "Batch poller started: every {:?}, {} symbols per chunk",
            self.config.interval, self.config.chunk_size
        );
        let ticker = tick(self.config.interval);
        self.run_cycle(shutdown);
        loop {
            select! {
                recv(shutdown.receiver()) -> _ => break,
                recv(ticker) -> _ => {
                    self.run_cycle(shutdown);
                }
            }
        }
        info!("Batch poller stopped");
    }

    /// One polling cycle: synthetic step or chunked fetch of the current roster.
    pub fn run_cycle(&self, shutdown: &Shutdown) -> CycleReport {
        if self.mode.is_synthetic_active() {
            let updated = self.generator.run_cycle(&self.fetch.registry);
            return CycleReport {
                synthetic: true,
                updated,
                ..CycleReport::default()
            };
        }
        if !self.fetch.has_session() {
            warn!("Live mode without a session credential; skipping polling cycle");
            return CycleReport::default();
        }

        let targets = self.roster.poll_targets();
        let report = self.fetch_in_chunks(&targets, shutdown);
        info!(
            "Polling cycle done: {} symbols, {} chunks ({} failed), {} updated",
            targets.len(),
            report.chunks,
            report.failed_chunks,
            report.updated
        );
        report
    }

    /// Fetch `targets` chunk by chunk, pausing after each chunk.
    pub fn fetch_in_chunks(&self, targets: &[String], shutdown: &Shutdown) -> CycleReport {
        let mut report = CycleReport::default();
        for chunk in targets.chunks(self.config.chunk_size.max(1)) {
            report.chunks += 1;
            match self.fetch.fetch_chunk(chunk) {
                Ok(updated) => {
                    debug!("Chunk of {} symbols updated {} entries", chunk.len(), updated);
                    report.updated += updated;
                }
                Err(e) => {
                    error!("Batch fetch failed for {} symbols: {}", chunk.len(), e);
                    report.failed_chunks += 1;
                }
            }
            if shutdown.wait(self.config.chunk_pause) {
                break;
            }
        }
        report
    }
}
