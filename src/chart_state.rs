// =============================================================================
// Chart State — versioned snapshot publication
// =============================================================================
//
// The session controller is the only writer; API consumers (REST handlers,
// the WebSocket push loop) read clones. The version counter increments on
// every publish so push consumers can detect change without diffing. A
// snapshot is valid only until the next publish — consumers must not retain
// one across mutations.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::indicators::{IndicatorConfig, IndicatorSeries};
use crate::market_data::Bar;
use crate::types::{InstrumentInfo, SessionPhase};

/// Everything the charting surface needs to draw one frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartSnapshot {
    /// Snapshot version; monotonically increasing across publishes.
    pub version: u64,
    /// Active instrument ticker ("" before the first selection).
    pub ticker: String,
    pub phase: SessionPhase,
    /// Present only in the Errored phase.
    pub error: Option<String>,
    pub instrument: Option<InstrumentInfo>,
    pub bars: Vec<Bar>,
    pub series: Vec<IndicatorSeries>,
    pub indicator_config: IndicatorConfig,
}

/// Shared holder for the latest snapshot.
#[derive(Default)]
pub struct ChartState {
    version: AtomicU64,
    snapshot: RwLock<ChartSnapshot>,
}

impl ChartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot, stamping it with the next version.
    /// Returns the stamped version.
    pub fn publish(&self, mut snapshot: ChartSnapshot) -> u64 {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot.version = version;
        *self.snapshot.write() = snapshot;
        version
    }

    /// The version of the most recently published snapshot.
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Clone of the most recently published snapshot.
    pub fn snapshot(&self) -> ChartSnapshot {
        self.snapshot.read().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
