pub mod rest;
pub mod ws;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chart_state::ChartState;
use crate::session::SessionEvent;

/// Shared context for all API handlers: the published chart state to read
/// from and the session event channel to write into.
pub struct ApiContext {
    pub chart: Arc<ChartState>,
    pub events: mpsc::Sender<SessionEvent>,
}
