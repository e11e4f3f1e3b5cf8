// =============================================================================
// Live Feed — WebSocket tick stream client
// =============================================================================
//
// Connects to the push feed and forwards decoded ticks into the session event
// channel. The feed wraps each trade update in an envelope whose `Content`
// field is itself a JSON-encoded string:
//
//   { "DataType": "B", "Content": "{\"Symbol\":\"VIC\",\"Open\":\"41.5\",...}" }
//
// Numeric fields arrive as JSON strings or numbers depending on the gateway
// version, so both are accepted. Malformed frames are logged and dropped;
// they never terminate the stream task.
// =============================================================================

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use crate::session::SessionEvent;
use crate::types::Tick;

/// Envelope `DataType` carrying a trade/bar update.
const DATA_TYPE_TRADE: &str = "B";

/// Keep the feed subscribed to the active instrument.
///
/// The subscription is per-instrument (`{base}/{ticker}/`), so an instrument
/// change tears down the current connection and opens a new one — late
/// frames from the old subscription are additionally screened out by the
/// session's symbol filter. Dropped connections reconnect after
/// `reconnect_delay`. Returns when the session loop goes away.
pub async fn run_feed_supervisor(
    base_url: String,
    mut ticker_rx: watch::Receiver<String>,
    tx: mpsc::Sender<SessionEvent>,
    reconnect_delay: std::time::Duration,
) {
    loop {
        let ticker = ticker_rx.borrow_and_update().clone();
        if ticker.is_empty() {
            // Nothing selected yet — wait for the first selection.
            if ticker_rx.changed().await.is_err() {
                return;
            }
            continue;
        }

        let url = format!("{base_url}/{ticker}/");
        tokio::select! {
            result = run_feed_stream(&url, &tx) => {
                if let Err(e) = result {
                    error!(ticker = %ticker, error = %e, "feed stream error — reconnecting");
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(reconnect_delay).await;
            }
            changed = ticker_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                info!(ticker = %ticker, "instrument changed — resubscribing feed");
            }
        }
    }
}

/// Connect to the tick WebSocket feed and forward every decoded tick into
/// `tx`.
///
/// Runs until the stream disconnects, a read error occurs, or the session
/// loop goes away, then returns so the caller can handle reconnection.
pub async fn run_feed_stream(url: &str, tx: &mpsc::Sender<SessionEvent>) -> Result<()> {
    info!(url = %url, "connecting to tick feed");

    let (ws_stream, _response) = connect_async(url)
        .await
        .context("failed to connect to tick feed")?;

    info!(url = %url, "tick feed connected");
    let (_write, mut read) = ws_stream.split();

    loop {
        match read.next().await {
            Some(Ok(msg)) => {
                if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                    match decode_tick_frame(&text) {
                        Ok(Some(tick)) => {
                            debug!(symbol = %tick.symbol, close = tick.close, "tick received");
                            if tx.send(SessionEvent::Tick(tick)).await.is_err() {
                                info!("session event channel closed — stopping feed");
                                return Ok(());
                            }
                        }
                        Ok(None) => {
                            // Envelope of a DataType we don't consume.
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to decode feed frame");
                        }
                    }
                }
                // Ping / Pong / Binary / Close frames are ignored —
                // tungstenite answers pings automatically.
            }
            Some(Err(e)) => {
                error!(error = %e, "tick feed read error");
                return Err(e.into());
            }
            None => {
                warn!(url = %url, "tick feed stream ended");
                return Ok(());
            }
        }
    }
}

/// Decode one feed frame.
///
/// Returns `Ok(None)` for envelopes of other data types (index updates,
/// foreign-room flows, ...) and `Err` for frames that claim to be trade
/// updates but fail to decode.
pub fn decode_tick_frame(text: &str) -> Result<Option<Tick>> {
    let envelope: serde_json::Value =
        serde_json::from_str(text).context("failed to parse feed envelope JSON")?;

    if envelope["DataType"].as_str() != Some(DATA_TYPE_TRADE) {
        return Ok(None);
    }

    let content_raw = envelope["Content"]
        .as_str()
        .context("missing field Content")?;
    let content: serde_json::Value =
        serde_json::from_str(content_raw).context("failed to parse Content JSON")?;

    let symbol = content["Symbol"]
        .as_str()
        .context("missing field Symbol")?
        .to_uppercase();

    let open = parse_field_f64(&content["Open"], "Open")?;
    let high = parse_field_f64(&content["High"], "High")?;
    let low = parse_field_f64(&content["Low"], "Low")?;
    let close = parse_field_f64(&content["Close"], "Close")?;

    // Some gateway versions omit Volume on quote-only updates.
    let volume = parse_field_u64(&content["Volume"]).unwrap_or(0);

    Ok(Some(Tick {
        symbol,
        open,
        high,
        low,
        close,
        volume,
    }))
}

/// Accept a numeric field encoded either as a JSON string or a JSON number.
fn parse_field_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
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

fn parse_field_u64(val: &serde_json::Value) -> Option<u64> {
    match val {
        serde_json::Value::String(s) => s.parse::<u64>().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
