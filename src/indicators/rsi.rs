// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Compute close-to-close deltas.
// Step 2 — Seed average gain / average loss with the SMA of the first
//          `period` gains / losses.
// Step 3 — Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Values are bounded to [0, 100]. The first `period` bars are consumed by
// the seed, so the first point aligns to bar index `period`.
// =============================================================================

use crate::indicators::IndicatorPoint;
use crate::market_data::Bar;

/// Compute the RSI series over closing prices.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `bars.len() < period + 1` => empty vec (need at least `period` deltas)
/// - If average loss is zero (no down moves), RSI is clamped to 100.0; if
///   both averages are zero (flat market), RSI is 50.0.
pub fn rsi(bars: &[Bar], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();

    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(IndicatorPoint {
        date: bars[period].date,
        value: rsi_from_averages(avg_gain, avg_loss),
    });

    for (i, &delta) in deltas.iter().enumerate().skip(period) {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        result.push(IndicatorPoint {
            // delta[i] closes at bar i + 1
            date: bars[i + 1].date,
            value: rsi_from_averages(avg_gain, avg_loss),
        });
    }

    result
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // No movement at all — neutral.
    } else if avg_loss == 0.0 {
        100.0 // All gains, no losses.
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::tests::bars_from_closes;

    #[test]
    fn empty_input() {
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn period_zero() {
        assert!(rsi(&bars_from_closes(&[1.0, 2.0, 3.0]), 0).is_empty());
    }

    #[test]
    fn insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let bars = bars_from_closes(&(1..=14).map(|x| x as f64).collect::<Vec<_>>());
        assert!(rsi(&bars, 14).is_empty());
    }

    #[test]
    fn first_point_aligns_to_bar_period() {
        let bars = bars_from_closes(&(1..=30).map(|x| x as f64).collect::<Vec<_>>());
        let out = rsi(&bars, 14);
        assert_eq!(out.len(), bars.len() - 14);
        assert_eq!(out[0].date, bars[14].date);
        assert_eq!(out.last().unwrap().date, bars.last().unwrap().date);
    }

    #[test]
    fn all_gains_is_100() {
        let bars = bars_from_closes(&(1..=30).map(|x| x as f64).collect::<Vec<_>>());
        for p in rsi(&bars, 14) {
            assert!((p.value - 100.0).abs() < 1e-10, "expected 100, got {}", p.value);
        }
    }

    #[test]
    fn all_losses_is_0() {
        let bars = bars_from_closes(&(1..=30).rev().map(|x| x as f64).collect::<Vec<_>>());
        for p in rsi(&bars, 14) {
            assert!(p.value.abs() < 1e-10, "expected 0, got {}", p.value);
        }
    }

    #[test]
    fn flat_market_is_50() {
        let bars = bars_from_closes(&vec![100.0; 30]);
        for p in rsi(&bars, 14) {
            assert!((p.value - 50.0).abs() < 1e-10, "expected 50, got {}", p.value);
        }
    }

    #[test]
    fn always_within_bounds() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let bars = bars_from_closes(&closes);
        let out = rsi(&bars, 14);
        assert!(!out.is_empty());
        for p in out {
            assert!((0.0..=100.0).contains(&p.value), "RSI {} out of range", p.value);
        }
    }
}
