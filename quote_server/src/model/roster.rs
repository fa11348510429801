//! Partition of tracked symbols into the streamed priority tier and the polled
//! standard tier.
//!
//! The roster has its own lock, independent of the registry's. No method holds the
//! roster lock while touching the registry, so a polling cycle copying the roster
//! can never deadlock against a writer registering a new symbol.

use crate::model::registry::QuoteRegistry;
use log::warn;
use quote_common::tickers::canonicalize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of asking the roster to track a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Input was empty or not a symbol.
    Invalid,
    /// Symbol already has a registry entry.
    AlreadyTracked(String),
    /// Symbol was appended to the standard tier and registered.
    Added(String),
}

/// Priority and standard tiers.
pub struct SymbolRoster {
    priority: Vec<String>,
    standard: Mutex<Vec<String>>,
}

impl SymbolRoster {
    /// Build a roster. The priority tier is fixed for the lifetime of the roster.
    pub fn new(priority: Vec<String>, standard: Vec<String>) -> Self {
        Self {
            priority,
            standard: Mutex::new(standard),
        }
    }

    fn standard(&self) -> MutexGuard<'_, Vec<String>> {
        self.standard.lock().unwrap_or_else(|err| {
            warn!("Symbol roster lock poisoned; continuing with inner state");
            PoisonError::into_inner(err)
        })
    }

    /// Priority tier, in startup order.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Independent copy of the standard tier.
    pub fn snapshot_standard(&self) -> Vec<String> {
        self.standard().clone()
    }

    /// Every symbol a polling cycle should fetch: the standard tier followed by the
    /// priority tier, whose change percent the stream does not provide.
    pub fn poll_targets(&self) -> Vec<String> {
        let mut targets = self.snapshot_standard();
        targets.extend(self.priority.iter().cloned());
        targets
    }

    /// Canonicalize `raw` and, if new, register it in `registry` and append it to the
    /// standard tier.
    ///
    /// The registry insert is the existence check, so two concurrent calls for the
    /// same symbol produce exactly one `Added`.
    pub fn track_new(&self, raw: &str, registry: &QuoteRegistry) -> TrackOutcome {
        let Some(symbol) = canonicalize(raw) else {
            return TrackOutcome::Invalid;
        };
        if !registry.upsert_if_absent(&symbol, false) {
            return TrackOutcome::AlreadyTracked(symbol);
        }
        self.standard().push(symbol.clone());
        TrackOutcome::Added(symbol)
    }
}
