//! Yahoo Finance session handshake and batch quote fetcher.
//!
//! Both share one cookie-carrying blocking HTTP client: the handshake first visits
//! the cookie endpoint, then exchanges the cookie for a crumb, and every quote
//! request sends the cookie along with the crumb as a query parameter.

use crate::feed::polling::{QuoteFetcher, SessionCredential, SessionProvider};
use crate::model::registry::QuoteRecord;
use log::debug;
use quote_common::{FeedError, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
/// Batch quote endpoint.
pub const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

fn http_err(e: reqwest::Error) -> FeedError {
    FeedError::Http(e.to_string())
}

/// Build the shared HTTP client.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(http_err)
}

/// Cookie + crumb handshake.
pub struct YahooSession {
    client: Client,
}

impl YahooSession {
    /// Create a handshake over `client`; the fetcher must use the same client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SessionProvider for YahooSession {
    fn acquire_session(&self) -> Result<SessionCredential> {
        // The cookie endpoint answers 404 while still setting the cookie.
        self.client
            .get(COOKIE_URL)
            .send()
            .map_err(|e| FeedError::Session(e.to_string()))?;

        let response = self
            .client
            .get(CRUMB_URL)
            .send()
            .map_err(|e| FeedError::Session(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FeedError::Session(format!("crumb status {}", response.status())));
        }
        let crumb = response
            .text()
            .map_err(|e| FeedError::Session(e.to_string()))?;
        let crumb = crumb.trim();
        if crumb.is_empty() {
            return Err(FeedError::Session("empty crumb".into()));
        }
        Ok(SessionCredential::new(crumb))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    symbol: String,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: Option<f64>,
}

impl From<YahooQuote> for QuoteRecord {
    fn from(q: YahooQuote) -> Self {
        QuoteRecord {
            symbol: q.symbol,
            price: q.regular_market_price.unwrap_or(0.0),
            change_percent: q.regular_market_change_percent.unwrap_or(0.0),
        }
    }
}

/// Decode a v7 quote response body.
pub fn parse_quote_response(body: &[u8]) -> Result<Vec<QuoteRecord>> {
    let envelope: QuoteEnvelope = serde_json::from_slice(body)?;
    Ok(envelope
        .quote_response
        .result
        .into_iter()
        .map(QuoteRecord::from)
        .collect())
}

/// One GET per chunk against the v7 quote endpoint.
pub struct YahooQuoteFetcher {
    client: Client,
    endpoint: String,
}

impl YahooQuoteFetcher {
    /// Create a fetcher over the client that acquired the session.
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

impl QuoteFetcher for YahooQuoteFetcher {
    fn fetch_quotes(
        &self,
        symbols: &[String],
        session: &SessionCredential,
    ) -> Result<Vec<QuoteRecord>> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[("symbols", symbols.join(",")), ("crumb", session.as_str().to_string())],
        )
        .map_err(|e| FeedError::Format(e.to_string()))?;

        let response = self.client.get(url).send().map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamStatus(status.as_u16()));
        }
        let body = response.bytes().map_err(http_err)?;
        let records = parse_quote_response(&body)?;
        debug!("Fetched {} of {} quotes", records.len(), symbols.len());
        Ok(records)
    }
}
