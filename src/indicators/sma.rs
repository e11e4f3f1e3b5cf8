// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

use crate::indicators::IndicatorPoint;
use crate::market_data::Bar;

/// Compute the SMA of closing prices over `period` bars.
///
/// Produces one point per bar from index `period - 1`, each aligned to the
/// date of the bar closing its window: `n - period + 1` points for `n` bars.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `bars.len() < period` => empty vec
pub fn sma(bars: &[Bar], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(bars.len() - period + 1);
    for i in (period - 1)..bars.len() {
        let window = &bars[i + 1 - period..=i];
        let sum: f64 = window.iter().map(|b| b.close).sum();
        result.push(IndicatorPoint {
            date: bars[i].date,
            value: sum / period as f64,
        });
    }

    result
}
