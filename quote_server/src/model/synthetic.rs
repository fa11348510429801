//! Synthetic random-walk generator.
//!
//! Stands in for both upstreams while synthetic mode is active so the table never
//! freezes or shows empty rows. Each cycle visits every registry entry once:
//! unobserved entries are seeded with a plausible price, observed entries move by a
//! small bounded amount with a fixed probability.
//!
//! Random values are drawn before the registry lock is taken and each entry is
//! written under its own short write lock, so a cycle never holds the whole map
//! exclusively while readers wait.

use crate::config::SyntheticConfig;
use crate::model::registry::{QuoteRegistry, SyntheticStep};
use log::debug;
use rand::Rng;

/// Bounded random walk over the registry.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    config: SyntheticConfig,
}

impl SyntheticGenerator {
    /// Create a generator with the given bounds.
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Draw the next step for one entry.
    ///
    /// The move is sampled uniformly from `[-max_move, +max_move)` with probability
    /// `move_probability`, otherwise zero; the change-percent delta is the move scaled
    /// by `change_scale`.
    pub fn next_step<R: Rng>(&self, rng: &mut R) -> SyntheticStep {
        let cfg = &self.config;
        // Seeds lie strictly inside the range; the half-open draw can hit the low end.
        let seed = loop {
            let seed = rng.random_range(cfg.seed_min..cfg.seed_max);
            if seed > cfg.seed_min {
                break seed;
            }
        };
        let delta = if rng.random_bool(cfg.move_probability) {
            rng.random_range(-cfg.max_move..cfg.max_move)
        } else {
            0.0
        };
        SyntheticStep {
            seed,
            delta,
            change_delta: delta * cfg.change_scale,
        }
    }

    /// Run one cycle over every registry entry with the thread-local RNG.
    pub fn run_cycle(&self, registry: &QuoteRegistry) -> usize {
        self.run_cycle_with(registry, &mut rand::rng())
    }

    /// Run one cycle with a caller-supplied RNG. Returns the number of entries visited.
    pub fn run_cycle_with<R: Rng>(&self, registry: &QuoteRegistry, rng: &mut R) -> usize {
        let mut visited = 0;
        for symbol in registry.symbols() {
            let step = self.next_step(rng);
            if registry.apply_synthetic_step(&symbol, step) {
                visited += 1;
            }
        }
        debug!("Synthetic cycle updated {} entries", visited);
        visited
    }
}
