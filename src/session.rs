// =============================================================================
// Session Controller — instrument lifecycle and ordering guarantees
// =============================================================================
//
// The historical fetch and the live tick feed are independent asynchronous
// sources with no ordering guarantee between them. The controller closes
// that gap: per instrument selection it runs the state machine
//
//   Idle → Loading → Ready
//                  ↘ Errored
//
// queueing every tick that arrives while Loading and draining the queue,
// oldest first, immediately after the historical seed is applied. Each
// selection bumps a generation counter; an in-flight fetch that resolves
// after the instrument changed carries a stale generation and is ignored,
// as is any late tick for a symbol that is no longer active.
//
// All events are handled by a single consumer task (`run_session`), so no
// two mutations of the bar sequence ever interleave.
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::chart_state::{ChartSnapshot, ChartState};
use crate::history::HistoryClient;
use crate::indicators::{compute_all, IndicatorConfig};
use crate::market_data::{Bar, BarAggregator};
use crate::types::{InstrumentInfo, SessionPhase, Tick};

/// Inbound events consumed by the session loop, one at a time.
#[derive(Debug)]
pub enum SessionEvent {
    /// The user selected an instrument (full reset, refetch).
    SelectInstrument(String),
    /// A historical fetch resolved, tagged with the generation it was
    /// spawned under.
    HistoryLoaded {
        generation: u64,
        result: Result<(Vec<Bar>, InstrumentInfo)>,
    },
    /// A live tick arrived from the feed.
    Tick(Tick),
    /// The user changed indicator parameters or visibility.
    SetIndicatorConfig(IndicatorConfig),
}

/// Owns the aggregator across instrument switches, gates tick consumption
/// until history is loaded, and republishes the chart snapshot whenever bars
/// or indicator parameters change.
pub struct SessionController {
    phase: SessionPhase,
    /// Bumped on every instrument selection; stale async results are
    /// detected by comparing against it.
    generation: u64,
    ticker: String,
    instrument: Option<InstrumentInfo>,
    error: Option<String>,
    aggregator: BarAggregator,
    /// Ticks that arrived while Loading, in arrival order, each stamped
    /// with the bucket date it arrived on.
    pending: VecDeque<(Tick, NaiveDate)>,
    config: IndicatorConfig,
    chart: Arc<ChartState>,
}

impl SessionController {
    pub fn new(chart: Arc<ChartState>, config: IndicatorConfig) -> Self {
        let mut controller = Self {
            phase: SessionPhase::Idle,
            generation: 0,
            ticker: String::new(),
            instrument: None,
            error: None,
            aggregator: BarAggregator::new(),
            pending: VecDeque::new(),
            config,
            chart,
        };
        controller.publish();
        controller
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new instrument session: full reset, enter Loading, and return
    /// the generation the caller must tag the history fetch with.
    pub fn select_instrument(&mut self, ticker: &str) -> u64 {
        self.generation += 1;
        self.ticker = ticker.to_uppercase();
        self.phase = SessionPhase::Loading;
        self.instrument = None;
        self.error = None;
        self.aggregator.reset();
        self.pending.clear();

        info!(
            ticker = %self.ticker,
            generation = self.generation,
            "instrument selected — loading history"
        );
        self.publish();
        self.generation
    }

    /// Apply a resolved historical fetch.
    ///
    /// A result tagged with a stale generation belongs to a previous
    /// selection and must not touch the current sequence.
    pub fn on_history_loaded(
        &mut self,
        generation: u64,
        result: Result<(Vec<Bar>, InstrumentInfo)>,
    ) {
        if generation != self.generation {
            info!(
                stale = generation,
                current = self.generation,
                "ignoring history fetch for a previous instrument selection"
            );
            return;
        }

        match result {
            Ok((bars, instrument)) => {
                info!(
                    ticker = %self.ticker,
                    bars = bars.len(),
                    queued = self.pending.len(),
                    "history loaded — seeding and draining queue"
                );
                self.aggregator.seed(bars);
                self.instrument = Some(instrument);
                self.phase = SessionPhase::Ready;

                // Drain oldest-first: the net effect is the same as if every
                // queued tick had arrived strictly after the seed.
                while let Some((tick, bucket)) = self.pending.pop_front() {
                    self.aggregator.merge_tick_on(&tick, bucket);
                }
            }
            Err(e) => {
                warn!(ticker = %self.ticker, error = %e, "history fetch failed");
                self.phase = SessionPhase::Errored;
                self.error = Some(e.to_string());
                self.pending.clear();
            }
        }
        self.publish();
    }

    /// Handle a live tick, assigning it to today's UTC bucket.
    pub fn on_tick(&mut self, tick: &Tick) {
        self.on_tick_at(tick, Utc::now().date_naive());
    }

    /// Handle a live tick with an explicit bucket date.
    pub fn on_tick_at(&mut self, tick: &Tick, bucket: NaiveDate) {
        if !tick.symbol.eq_ignore_ascii_case(&self.ticker) {
            debug!(symbol = %tick.symbol, active = %self.ticker, "tick for inactive symbol ignored");
            return;
        }

        match self.phase {
            SessionPhase::Loading => {
                self.pending.push_back((tick.clone(), bucket));
            }
            SessionPhase::Ready => {
                self.aggregator.merge_tick_on(tick, bucket);
                self.publish();
            }
            SessionPhase::Idle | SessionPhase::Errored => {
                debug!(symbol = %tick.symbol, phase = %self.phase, "tick dropped");
            }
        }
    }

    /// Replace the indicator configuration and recompute the derived series
    /// against the unchanged bar sequence.
    pub fn set_indicator_config(&mut self, config: IndicatorConfig) {
        self.config = config;
        self.publish();
    }

    /// Recompute every derived series against the current sequence and push
    /// a fresh snapshot to consumers. Always a full recompute — bar counts
    /// are bounded by trading history, so nothing is patched incrementally.
    fn publish(&mut self) {
        let bars = self.aggregator.bars().to_vec();
        let series = compute_all(&bars, &self.config);
        self.chart.publish(ChartSnapshot {
            version: 0, // stamped by ChartState
            ticker: self.ticker.clone(),
            phase: self.phase,
            error: self.error.clone(),
            instrument: self.instrument.clone(),
            bars,
            series,
            indicator_config: self.config.clone(),
        });
    }
}

// =============================================================================
// Event loop
// =============================================================================

/// Consume session events until the channel closes.
///
/// History fetches are spawned from here and resolve back into the same
/// channel, tagged with the generation that spawned them — the tag, not task
/// cancellation, is what makes a late result for a stale selection harmless.
pub async fn run_session(
    mut rx: mpsc::Receiver<SessionEvent>,
    tx: mpsc::Sender<SessionEvent>,
    history: HistoryClient,
    chart: Arc<ChartState>,
    config: IndicatorConfig,
    feed_ticker: watch::Sender<String>,
) {
    let mut controller = SessionController::new(chart, config);

    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::SelectInstrument(ticker) => {
                let generation = controller.select_instrument(&ticker);
                let ticker = ticker.to_uppercase();
                // Point the feed supervisor at the new instrument.
                let _ = feed_ticker.send(ticker.clone());
                let history = history.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = history.fetch(&ticker).await;
                    if tx
                        .send(SessionEvent::HistoryLoaded { generation, result })
                        .await
                        .is_err()
                    {
                        debug!("session loop gone — dropping history result");
                    }
                });
            }
            SessionEvent::HistoryLoaded { generation, result } => {
                controller.on_history_loaded(generation, result);
            }
            SessionEvent::Tick(tick) => controller.on_tick(&tick),
            SessionEvent::SetIndicatorConfig(config) => controller.set_indicator_config(config),
        }
    }

    info!("session event channel closed — controller stopping");
}

// =============================================================================
// Tests
// =============================================================================
