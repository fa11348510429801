//! Quote state record and the snapshot frame broadcast to presentation clients.
//!
//! `QuoteState` lives in the server's registry and is copied verbatim into every
//! `Snapshot`; clients decode the same type from the frames in `frame`.
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current state of a single tracked symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteState {
    /// Canonical symbol.
    pub symbol: String,
    /// Latest known price; `0.0` means never observed.
    pub price: f64,
    /// Latest known percent change versus prior close.
    pub change_percent: f64,
    /// Set once a real streaming update has been applied. Never reset.
    pub is_live: bool,
    /// Priority tier membership, used for presentation ordering.
    pub is_priority: bool,
}

impl QuoteState {
    /// Create an unobserved entry for `symbol`.
    pub fn new(symbol: &str, is_priority: bool) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            change_percent: 0.0,
            is_live: false,
            is_priority,
        }
    }

    /// Whether a price has been observed from any source.
    pub fn has_price(&self) -> bool {
        self.price > 0.0
    }
}

/// Point-in-time copy of the whole registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// UTC timestamp in milliseconds since Unix epoch.
    pub taken_at: i64,
    /// Quotes ordered priority-first, then by symbol.
    pub quotes: Vec<QuoteState>,
}

impl Snapshot {
    /// Stamp `quotes` with the current time.
    pub fn new(quotes: Vec<QuoteState>) -> Self {
        Self {
            taken_at: Utc::now().timestamp_millis(),
            quotes,
        }
    }
}
