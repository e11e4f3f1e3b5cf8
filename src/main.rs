// =============================================================================
// Candela Chart Core — Main Entry Point
// =============================================================================
//
// Wires the chart core together: the session loop that owns the bar
// sequence, the per-instrument tick feed, the historical REST client, and
// the snapshot API the charting surface consumes. The first instrument is
// selected from config at startup; everything after that is event-driven.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod chart_state;
mod history;
mod indicators;
mod market_data;
mod runtime_config;
mod session;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::chart_state::ChartState;
use crate::history::HistoryClient;
use crate::indicators::IndicatorConfig;
use crate::runtime_config::RuntimeConfig;
use crate::session::SessionEvent;

/// Capacity of the session event channel. Ticks arrive at human trading
/// cadence; a burst beyond this just backpressures the feed reader.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Candela Chart Core — starting up");

    let mut config = RuntimeConfig::load("candela.json").unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    info!(
        ticker = %config.default_ticker,
        api = %config.api_base_url,
        feed = %config.feed_base_url,
        "configured collaborators"
    );

    // ── 2. Shared state & channels ───────────────────────────────────────
    let chart = Arc::new(ChartState::new());
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(EVENT_CHANNEL_CAPACITY);
    let (ticker_tx, ticker_rx) = watch::channel(String::new());

    let history = HistoryClient::new(config.api_base_url.clone(), &config.api_token);

    // ── 3. Session loop ──────────────────────────────────────────────────
    {
        let chart = chart.clone();
        let tx = event_tx.clone();
        tokio::spawn(async move {
            session::run_session(
                event_rx,
                tx,
                history,
                chart,
                IndicatorConfig::default(),
                ticker_tx,
            )
            .await;
        });
    }

    // ── 4. Tick feed ─────────────────────────────────────────────────────
    {
        let tx = event_tx.clone();
        let base = config.feed_base_url.clone();
        let delay = std::time::Duration::from_secs(config.feed_reconnect_secs);
        tokio::spawn(async move {
            market_data::feed::run_feed_supervisor(base, ticker_rx, tx, delay).await;
        });
    }

    // ── 5. Initial instrument selection ──────────────────────────────────
    event_tx
        .send(SessionEvent::SelectInstrument(
            config.default_ticker.clone(),
        ))
        .await
        .expect("session loop just spawned");

    // ── 6. Chart API server ──────────────────────────────────────────────
    let ctx = Arc::new(ApiContext {
        chart,
        events: event_tx,
    });
    let app = api::rest::router(ctx);
    let listener = tokio::net::TcpListener::bind(&config.api_bind)
        .await
        .with_context(|| format!("failed to bind API server on {}", config.api_bind))?;
    info!(addr = %config.api_bind, "chart API listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server error");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received — stopping");

    info!("Candela Chart Core shut down complete.");
    Ok(())
}
