//!
//! Common types and utilities shared by the quote server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `FeedError` used across the workspace.
//! - `result` — handy `Result<T, FeedError>` alias.
//! - `tickers` — symbol canonicalization, ticker-file parsing and the built-in universe.
//! - `quote` — the `QuoteState` record and the `Snapshot` it is broadcast in.
//! - `frame` — splitting snapshots into datagram-sized frames and reassembling them.
//! - `command` — TCP command payloads exchanged between client and server.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod command;
pub mod error;
pub mod frame;
pub mod net;
pub mod quote;
pub mod result;
pub mod tickers;

pub use command::Command;
pub use error::FeedError;
pub use frame::{FrameAssembler, SnapshotFrame};
pub use quote::{QuoteState, Snapshot};
pub use result::Result;
