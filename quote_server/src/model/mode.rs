//! Live/synthetic mode flag.
//!
//! The flag is level-triggered: sources read it at every cycle or poll and act on
//! the current value. There are no transition callbacks and switching never touches
//! quote state.

use log::info;
use quote_common::command::FeedMode;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "synthetic active" flag.
#[derive(Debug, Default)]
pub struct ModeController {
    synthetic: AtomicBool,
}

impl ModeController {
    /// Create a controller starting in `mode`.
    pub fn new(mode: FeedMode) -> Self {
        Self {
            synthetic: AtomicBool::new(mode.is_synthetic()),
        }
    }

    /// Switch the data source. Takes effect at each source's next check.
    pub fn set_synthetic_active(&self, active: bool) {
        let previous = self.synthetic.swap(active, Ordering::SeqCst);
        if previous != active {
            info!("Switched to {} mode", self.mode().to_string().to_uppercase());
        }
    }

    /// Current flag value.
    pub fn is_synthetic_active(&self) -> bool {
        self.synthetic.load(Ordering::SeqCst)
    }

    /// Current flag as a `FeedMode`.
    pub fn mode(&self) -> FeedMode {
        if self.is_synthetic_active() {
            FeedMode::Synthetic
        } else {
            FeedMode::Live
        }
    }
}
