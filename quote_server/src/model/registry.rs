//! Shared symbol -> quote table.
//!
//! `QuoteRegistry` is the single owner of every `QuoteState`. All ingestion sources
//! write through it and the broadcaster reads from it; nothing else holds quote
//! state. One `RwLock` guards the whole map, and every method takes it exactly once
//! and releases it before returning, so no caller ever observes a half-applied
//! update and no method blocks on I/O.
//!
//! Field freshness is tracked per field, not per record: a streaming update replaces
//! `price` and leaves `change_percent` from the last batch update in place.

use log::warn;
use quote_common::QuoteState;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One batch-fetched record, as returned by the fetch collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    /// Symbol as reported upstream.
    pub symbol: String,
    /// Reported price; `0.0` when missing.
    pub price: f64,
    /// Reported percent change versus prior close.
    pub change_percent: f64,
}

/// One synthetic random-walk step for a single entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticStep {
    /// Price used only when the entry has never been observed.
    pub seed: f64,
    /// Price delta; applied to a previously observed price.
    pub delta: f64,
    /// Change-percent delta applied together with `delta`.
    pub change_delta: f64,
}

/// Floor for synthetic prices.
const MIN_SYNTHETIC_PRICE: f64 = 0.01;

fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Concurrency-safe symbol -> `QuoteState` map.
#[derive(Default)]
pub struct QuoteRegistry {
    quotes: RwLock<HashMap<String, QuoteState>>,
}

impl QuoteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // A writer that panicked mid-call can only have completed whole field stores,
    // so the map is still consistent and the poison flag is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, QuoteState>> {
        self.quotes.read().unwrap_or_else(|err| {
            warn!("Quote registry lock poisoned; continuing with inner state");
            PoisonError::into_inner(err)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, QuoteState>> {
        self.quotes.write().unwrap_or_else(|err| {
            warn!("Quote registry lock poisoned; continuing with inner state");
            PoisonError::into_inner(err)
        })
    }

    /// Copy of the current state of `symbol`.
    pub fn get(&self, symbol: &str) -> Option<QuoteState> {
        self.read().get(symbol).cloned()
    }

    /// Whether `symbol` is tracked.
    pub fn contains(&self, symbol: &str) -> bool {
        self.read().contains_key(symbol)
    }

    /// Number of tracked symbols.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All tracked symbols, in no particular order.
    pub fn symbols(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Create an unobserved entry for `symbol` unless one exists.
    ///
    /// Returns `true` when a new entry was created. The check and the insert happen
    /// under one write lock, so two racing callers cannot both create the symbol.
    pub fn upsert_if_absent(&self, symbol: &str, is_priority: bool) -> bool {
        let mut quotes = self.write();
        if quotes.contains_key(symbol) {
            return false;
        }
        quotes.insert(symbol.to_string(), QuoteState::new(symbol, is_priority));
        true
    }

    /// Apply a streamed trade price and mark the entry live.
    ///
    /// Unknown symbols and non-positive prices are ignored. `change_percent` is
    /// never touched by this path.
    pub fn apply_streaming_update(&self, symbol: &str, price: f64) -> bool {
        if !is_valid_price(price) {
            return false;
        }
        match self.write().get_mut(symbol) {
            Some(state) => {
                state.price = price;
                state.is_live = true;
                true
            }
            None => false,
        }
    }

    /// Apply a batch-polled price and change percent.
    ///
    /// Both fields are replaced together, and only when `price` is a valid positive
    /// value; a zero or missing price never blanks a known quote.
    pub fn apply_batch_update(&self, symbol: &str, price: f64, change_percent: f64) -> bool {
        if !is_valid_price(price) {
            return false;
        }
        match self.write().get_mut(symbol) {
            Some(state) => {
                state.price = price;
                if change_percent.is_finite() {
                    state.change_percent = change_percent;
                }
                true
            }
            None => false,
        }
    }

    /// Apply a chunk of batch records under a single write lock.
    ///
    /// Returns the number of records that changed an entry.
    pub fn apply_batch_records(&self, records: &[QuoteRecord]) -> usize {
        let mut quotes = self.write();
        let mut applied = 0;
        for record in records {
            if !is_valid_price(record.price) {
                continue;
            }
            if let Some(state) = quotes.get_mut(&record.symbol) {
                state.price = record.price;
                if record.change_percent.is_finite() {
                    state.change_percent = record.change_percent;
                }
                applied += 1;
            }
        }
        applied
    }

    /// Apply one synthetic random-walk step.
    ///
    /// A never-observed entry is seeded with `step.seed` and does not move in the same
    /// step; an observed entry moves by `step.delta`, floored at a small positive
    /// price. `is_live` is left untouched.
    pub fn apply_synthetic_step(&self, symbol: &str, step: SyntheticStep) -> bool {
        match self.write().get_mut(symbol) {
            Some(state) => {
                if !state.has_price() {
                    state.price = step.seed;
                } else {
                    state.price = (state.price + step.delta).max(MIN_SYNTHETIC_PRICE);
                    state.change_percent += step.change_delta;
                }
                true
            }
            None => false,
        }
    }

    /// Independent copy of every entry, priority tier first, then by symbol.
    pub fn snapshot(&self) -> Vec<QuoteState> {
        let mut quotes: Vec<QuoteState> = self.read().values().cloned().collect();
        quotes.sort_by(|a, b| {
            b.is_priority
                .cmp(&a.is_priority)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        quotes
    }
}
