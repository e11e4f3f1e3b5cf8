// =============================================================================
// Historical Data Client — REST collaborator for bars + instrument metadata
// =============================================================================
//
// Consumed once per instrument selection. The two requests (bar history and
// instrument metadata) run concurrently; either failing fails the fetch as a
// whole and sends the session to the Errored phase. Individual bar records
// that fail to decode are dropped with a diagnostic — one bad row must not
// take down the batch.
// =============================================================================

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::market_data::Bar;
use crate::types::InstrumentInfo;

/// Client for the historical-data REST collaborator.
#[derive(Clone)]
pub struct HistoryClient {
    base_url: String,
    client: reqwest::Client,
}

impl HistoryClient {
    /// Create a new `HistoryClient`.
    ///
    /// # Arguments
    /// * `base_url` — API root, e.g. `http://127.0.0.1:8000/api`.
    /// * `api_token` — static token sent as `Authorization: Token <t>`;
    ///   empty disables the header.
    pub fn new(base_url: impl Into<String>, api_token: &str) -> Self {
        let mut default_headers = HeaderMap::new();
        if !api_token.is_empty() {
            if let Ok(val) = HeaderValue::from_str(&format!("Token {api_token}")) {
                default_headers.insert("Authorization", val);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.into();
        debug!(base_url = %base_url, "HistoryClient initialised");

        Self { base_url, client }
    }

    /// Fetch the historical bars and instrument metadata for `ticker`,
    /// concurrently.
    pub async fn fetch(&self, ticker: &str) -> Result<(Vec<Bar>, InstrumentInfo)> {
        let (bars, info) = tokio::try_join!(self.fetch_bars(ticker), self.fetch_info(ticker))?;
        Ok((bars, info))
    }

    async fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>> {
        let url = format!("{}/stock-data/?ticker={ticker}", self.base_url);
        let records: Vec<serde_json::Value> = self
            .client
            .get(&url)
            .send()
            .await
            .context("historical bar request failed")?
            .error_for_status()
            .context("historical bar request rejected")?
            .json()
            .await
            .context("failed to decode historical bar response")?;

        Ok(records_to_bars(ticker, &records))
    }

    async fn fetch_info(&self, ticker: &str) -> Result<InstrumentInfo> {
        let url = format!("{}/stocks/{ticker}/", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .context("instrument metadata request failed")?
            .error_for_status()
            .context("instrument metadata request rejected")?
            .json()
            .await
            .context("failed to decode instrument metadata response")
    }
}

/// Convert raw records into bars, dropping malformed rows with a diagnostic.
fn records_to_bars(ticker: &str, records: &[serde_json::Value]) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(records.len());
    for record in records {
        match bar_from_record(record) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "dropping malformed historical record");
            }
        }
    }
    bars
}

/// Decode one historical record. The collaborator serializes prices either
/// as JSON numbers or as decimal strings depending on its serializer
/// settings, so both are accepted.
fn bar_from_record(record: &serde_json::Value) -> Result<Bar> {
    let date_str = record["date"].as_str().context("missing field date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("failed to parse date: {date_str}"))?;

    Ok(Bar {
        date,
        open: parse_price(&record["open"], "open")?,
        high: parse_price(&record["high"], "high")?,
        low: parse_price(&record["low"], "low")?,
        close: parse_price(&record["close"], "close")?,
        volume: parse_volume(&record["volume"]),
    })
}

fn parse_price(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

fn parse_volume(val: &serde_json::Value) -> u64 {
    match val {
        serde_json::Value::String(s) => s.parse::<u64>().unwrap_or(0),
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// Tests
// =============================================================================
