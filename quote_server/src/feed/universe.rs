//! Discovery of the initial symbol universe and its priority/standard partition.

use log::{info, warn};
use quote_common::tickers::{BACKUP_UNIVERSE, PRIORITY_SYMBOLS, TickerParser, Tickers, canonicalize};
use quote_common::{FeedError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Source of the symbols to track at startup.
pub trait UniverseProvider {
    /// Discover symbols. Order is preserved into the standard tier.
    fn discover(&self) -> Result<Vec<String>>;

    /// Fewer symbols than this is treated as a broken source.
    fn min_expected(&self) -> usize {
        1
    }
}

/// Reads symbols from a ticker file.
pub struct TickerFileUniverse {
    path: PathBuf,
}

impl TickerFileUniverse {
    /// Provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UniverseProvider for TickerFileUniverse {
    fn discover(&self) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .map_err(|e| FeedError::Universe(format!("{}: {}", self.path.display(), e)))?;
        Tickers::parse_from_file(BufReader::new(file))
    }
}

/// Startup partition of tracked symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    /// Streamed tier.
    pub priority: Vec<String>,
    /// Polled tier.
    pub standard: Vec<String>,
}

/// Split discovered symbols into tiers.
///
/// The curated priority list always forms the priority tier, whether or not the
/// source listed those symbols; everything else goes to the standard tier,
/// canonicalized and de-duplicated in discovery order.
pub fn partition_universe(discovered: &[String]) -> Universe {
    let priority: Vec<String> = PRIORITY_SYMBOLS.iter().map(|s| s.to_string()).collect();
    let mut seen: HashSet<String> = priority.iter().cloned().collect();
    let standard = discovered
        .iter()
        .filter_map(|raw| canonicalize(raw))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect();
    Universe { priority, standard }
}

/// Discover with `provider`, falling back to the built-in list on failure or on a
/// suspiciously short result.
pub fn discover_universe(provider: &dyn UniverseProvider) -> Universe {
    let discovered = match provider.discover() {
        Ok(list) if list.len() >= provider.min_expected() => {
            info!("Discovered {} symbols", list.len());
            list
        }
        Ok(list) => {
            warn!(
                "Discovered only {} symbols (expected at least {}); using built-in list",
                list.len(),
                provider.min_expected()
            );
            BACKUP_UNIVERSE.iter().map(|s| s.to_string()).collect()
        }
        Err(e) => {
            warn!("Universe discovery failed ({}); using built-in list", e);
            BACKUP_UNIVERSE.iter().map(|s| s.to_string()).collect()
        }
    };
    partition_universe(&discovered)
}
