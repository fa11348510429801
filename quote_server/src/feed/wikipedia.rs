//! Live S&P 500 discovery from the Wikipedia constituents table.
//!
//! The first cell of every row in `#constituents` holds the ticker. Anything that
//! yields fewer than `MIN_CONSTITUENTS` symbols is taken as a layout change, and the
//! caller falls back to the built-in list.

use crate::feed::universe::UniverseProvider;
use log::debug;
use quote_common::tickers::canonicalize;
use quote_common::{FeedError, Result};
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Constituents page.
pub const WIKI_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";
/// Shortest list accepted from the page.
pub const MIN_CONSTITUENTS: usize = 450;
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

fn universe_err(e: impl std::fmt::Display) -> FeedError {
    FeedError::Universe(e.to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| FeedError::Universe(format!("selector {}: {:?}", css, e)))
}

/// Extract canonical symbols from the constituents table, in page order.
pub fn parse_constituents(html: &str) -> Result<Vec<String>> {
    let rows = selector("#constituents tbody tr")?;
    let cells = selector("td")?;
    let document = Html::parse_document(html);

    // Header rows carry only <th> cells and yield nothing.
    Ok(document
        .select(&rows)
        .filter_map(|row| row.select(&cells).next())
        .filter_map(|cell| canonicalize(&cell.text().collect::<String>()))
        .collect())
}

/// Scrapes the constituents page over the shared HTTP client.
pub struct WikipediaUniverse {
    client: Client,
    url: String,
}

impl WikipediaUniverse {
    /// Provider reading the page at `url`.
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

impl UniverseProvider for WikipediaUniverse {
    fn discover(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .map_err(universe_err)?;
        if !response.status().is_success() {
            return Err(FeedError::UpstreamStatus(response.status().as_u16()));
        }
        let body = response.text().map_err(universe_err)?;
        let symbols = parse_constituents(&body)?;
        debug!("Constituents table listed {} symbols", symbols.len());
        Ok(symbols)
    }

    fn min_expected(&self) -> usize {
        MIN_CONSTITUENTS
    }
}
