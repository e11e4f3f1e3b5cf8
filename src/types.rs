// =============================================================================
// Shared types used across the Candela chart core
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single decoded trade update from the live feed.
///
/// The feed reports OHLC for the interval since its previous message (or a
/// last-trade price repeated across all four fields). A tick carries no
/// timestamp of its own; the aggregator assigns it to the current UTC
/// calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Trade size. Additive when merged into an existing bar.
    pub volume: u64,
}

/// Instrument metadata from the REST collaborator.
///
/// The `ticker` is also the identity external collaborators (e.g. the
/// watchlist service) key on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub ticker: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub industry: String,
}

/// Lifecycle phase of the active instrument session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No instrument selected yet.
    Idle,
    /// Historical fetch in flight; live ticks are queued.
    Loading,
    /// History seeded; live ticks merge immediately.
    Ready,
    /// Historical fetch failed; sequence is empty, ticks are dropped.
    Errored,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Errored => write!(f, "Errored"),
        }
    }
}
