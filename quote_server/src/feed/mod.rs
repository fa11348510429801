//! Upstream-facing ingestion: streaming, batch polling and their collaborators.
//!
//! - `streaming` — reconnecting push-feed state machine for the priority tier.
//! - `finnhub` — websocket transport for the streaming source.
//! - `polling` — chunked, paced batch poller and the fetch/session contracts.
//! - `yahoo` — HTTP session handshake and batch quote fetcher.
//! - `universe` — startup symbol discovery and tier partition.
//! - `wikipedia` — live constituents scrape, the default discovery source.

pub mod finnhub;
pub mod polling;
pub mod streaming;
pub mod universe;
pub mod wikipedia;
pub mod yahoo;
