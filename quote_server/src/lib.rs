//! Market quote engine.
//!
//! Maintains one in-memory table of quotes fed by two independently failing
//! upstreams, a websocket trade stream for a small priority tier and a batch HTTP
//! poller for everything else, plus a synthetic random walk used when neither is
//! available or selected. A broadcaster copies the table on a fixed cadence and
//! hands it to the presentation boundary.
//!
//! - `model` — registry, roster, mode flag, synthetic generator, subscriber tracking.
//! - `feed` — streaming and polling sources and their upstream collaborators.
//! - `broadcaster` — snapshot cadence and sinks.
//! - `registration` — runtime `track_ticker`.
//! - `receiver` / `udp_listener` — TCP command and UDP keep-alive boundaries.
//! - `engine` — assembly and lifecycle.
#![warn(missing_docs)]

pub mod broadcaster;
pub mod config;
pub mod engine;
pub mod feed;
pub mod model;
/// TCP command boundary.
pub mod receiver;
pub mod registration;
pub mod shutdown;
/// UDP keep-alive listener for snapshot subscribers.
pub mod udp_listener;
