//! Shared engine state and the pieces that mutate it without I/O.
//!
//! - `registry` — the symbol -> `QuoteState` table, single source of truth.
//! - `roster` — priority/standard partition of tracked symbols.
//! - `mode` — live/synthetic flag read by every source.
//! - `synthetic` — bounded random walk used while synthetic mode is active.
//! - `ping_monitor` — keep-alive tracker for snapshot subscribers.

pub mod mode;
pub mod ping_monitor;
pub mod registry;
pub mod roster;
pub mod synthetic;
