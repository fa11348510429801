//! Engine tunables.
//!
//! Every cadence and bound used by the ingestion loops lives here with its
//! production default; tests shrink the durations to milliseconds.
use std::time::Duration;

/// Batch polling cadence and chunking.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between the start of two polling cycles.
    pub interval: Duration,
    /// Maximum symbols per upstream request.
    pub chunk_size: usize,
    /// Pause after every chunk, successful or not.
    pub chunk_pause: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            chunk_size: 50,
            chunk_pause: Duration::from_millis(250),
        }
    }
}

/// Streaming reconnect behaviour.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Delay before reconnecting after a failure.
    pub reconnect_backoff: Duration,
    /// Upper bound when the backoff grows; equal to `reconnect_backoff` for a constant delay.
    pub max_backoff: Duration,
    /// How often the flag is re-checked while synthetic mode holds the stream down.
    pub mode_poll_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(5),
            mode_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Random-walk parameters for synthetic mode.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Lower bound for seeding never-observed prices.
    pub seed_min: f64,
    /// Upper bound for seeding never-observed prices.
    pub seed_max: f64,
    /// Chance per cycle that an entry moves.
    pub move_probability: f64,
    /// Largest absolute price move per cycle.
    pub max_move: f64,
    /// Change-percent delta as a fraction of the price move.
    pub change_scale: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed_min: 50.0,
            seed_max: 200.0,
            move_probability: 0.4,
            max_move: 0.75,
            change_scale: 0.1,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Batch polling settings.
    pub poll: PollConfig,
    /// Streaming settings.
    pub stream: StreamConfig,
    /// Synthetic generator settings.
    pub synthetic: SyntheticConfig,
    /// Snapshot cadence.
    pub broadcast_interval: Duration,
    /// Start in synthetic mode regardless of session state.
    pub start_synthetic: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            stream: StreamConfig::default(),
            synthetic: SyntheticConfig::default(),
            broadcast_interval: Duration::from_secs(1),
            start_synthetic: false,
        }
    }
}
