// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd line  = EMA(fast) - EMA(slow), over closes
//   signal     = EMA(signal period), over the macd line
//   histogram  = macd line - signal, pointwise
//
// All three series are full-length and aligned to every bar; the EMAs use
// this engine's uniform first-value seeding (see `ema.rs`), so the signal
// line is seeded from the first macd value.
// =============================================================================

use crate::indicators::ema::ema_series;
use crate::indicators::IndicatorPoint;
use crate::market_data::Bar;

/// The three aligned series produced by a MACD computation.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<IndicatorPoint>,
    pub signal: Vec<IndicatorPoint>,
    pub histogram: Vec<IndicatorPoint>,
}

/// Compute MACD over closing prices.
///
/// Produces no points unless `bars.len() >= slow` and all periods are
/// positive.
pub fn macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal == 0 || bars.len() < slow {
        return MacdSeries::default();
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast_ema = ema_series(&closes, fast);
    let slow_ema = ema_series(&closes, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&macd_line, signal);

    let mut out = MacdSeries {
        macd: Vec::with_capacity(bars.len()),
        signal: Vec::with_capacity(bars.len()),
        histogram: Vec::with_capacity(bars.len()),
    };

    for (i, bar) in bars.iter().enumerate() {
        out.macd.push(IndicatorPoint {
            date: bar.date,
            value: macd_line[i],
        });
        out.signal.push(IndicatorPoint {
            date: bar.date,
            value: signal_line[i],
        });
        out.histogram.push(IndicatorPoint {
            date: bar.date,
            value: macd_line[i] - signal_line[i],
        });
    }

    out
}
