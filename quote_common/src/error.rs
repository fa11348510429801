//! Error types shared between client and server.
//!
//! The `FeedError` enum unifies the failure cases of the market feed: I/O, JSON
//! serialization, upstream HTTP and websocket transport, session acquisition,
//! universe discovery and lock poisoning, allowing crates
//! to propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing a ticker file into symbols.
    #[error("Parse tickers file error: {0}")]
    ParseTickersFile(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// HTTP transport failure (connect, timeout, body read) against an upstream.
    #[error("HTTP transport error: {0}")]
    Http(String),

    /// Upstream answered with a non-success status code.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// Websocket transport failure on the streaming feed.
    #[error("Stream transport error: {0}")]
    Stream(String),

    /// Session/auth handshake with the polling provider failed.
    #[error("Session acquisition failed: {0}")]
    Session(String),

    /// Symbol universe discovery failed.
    #[error("Universe discovery failed: {0}")]
    Universe(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<PoisonError<T>> for FeedError {
    fn from(err: PoisonError<T>) -> Self {
        FeedError::LockPoisoned(err.to_string())
    }
}
