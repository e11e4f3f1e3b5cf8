// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA(period); upper/lower = middle ± k * σ, where σ is the
// rolling population standard deviation of closes over the same window.
// Alignment matches the SMA: one point per bar from index `period - 1`.
// =============================================================================

use crate::indicators::sma::sma;
use crate::indicators::IndicatorPoint;
use crate::market_data::Bar;

/// The three aligned band series.
#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub upper: Vec<IndicatorPoint>,
    pub middle: Vec<IndicatorPoint>,
    pub lower: Vec<IndicatorPoint>,
}

/// Compute Bollinger Bands over closing prices.
///
/// Produces no points when `period == 0` or there are fewer than `period`
/// bars.
pub fn bollinger(bars: &[Bar], period: usize, std_dev: f64) -> BollingerSeries {
    if period == 0 || bars.len() < period {
        return BollingerSeries::default();
    }

    let middle = sma(bars, period);
    let mut out = BollingerSeries {
        upper: Vec::with_capacity(middle.len()),
        lower: Vec::with_capacity(middle.len()),
        middle,
    };

    for (offset, mid) in out.middle.iter().enumerate() {
        let i = offset + period - 1;
        let window = &bars[i + 1 - period..=i];
        let variance = window
            .iter()
            .map(|b| (b.close - mid.value).powi(2))
            .sum::<f64>()
            / period as f64;
        let sigma = variance.sqrt();

        out.upper.push(IndicatorPoint {
            date: mid.date,
            value: mid.value + std_dev * sigma,
        });
        out.lower.push(IndicatorPoint {
            date: mid.date,
            value: mid.value - std_dev * sigma,
        });
    }

    out
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::tests::bars_from_closes;

    #[test]
    fn insufficient_data() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let out = bollinger(&bars, 20, 2.0);
        assert!(out.upper.is_empty());
        assert!(out.middle.is_empty());
        assert!(out.lower.is_empty());
    }

    #[test]
    fn bands_straddle_the_middle() {
        let bars = bars_from_closes(&(1..=25).map(|x| x as f64).collect::<Vec<_>>());
        let out = bollinger(&bars, 20, 2.0);
        assert_eq!(out.upper.len(), out.middle.len());
        assert_eq!(out.lower.len(), out.middle.len());
        for i in 0..out.middle.len() {
            assert!(out.upper[i].value > out.middle[i].value);
            assert!(out.lower[i].value < out.middle[i].value);
            assert_eq!(out.upper[i].date, out.middle[i].date);
        }
    }

    #[test]
    fn alignment_matches_sma() {
        let bars = bars_from_closes(&(1..=25).map(|x| x as f64).collect::<Vec<_>>());
        let out = bollinger(&bars, 20, 2.0);
        // n - period + 1 points, first aligned to bar index period - 1.
        assert_eq!(out.middle.len(), bars.len() - 20 + 1);
        assert_eq!(out.middle[0].date, bars[19].date);
    }

    #[test]
    fn flat_series_collapses_the_bands() {
        let bars = bars_from_closes(&vec![100.0; 20]);
        let out = bollinger(&bars, 20, 2.0);
        assert_eq!(out.middle.len(), 1);
        assert!((out.upper[0].value - 100.0).abs() < 1e-10);
        assert!((out.lower[0].value - 100.0).abs() < 1e-10);
    }

    #[test]
    fn known_sigma() {
        // Window [2, 4, 4, 4, 5, 5, 7, 9]: mean = 5, population σ = 2.
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bars = bars_from_closes(&closes);
        let out = bollinger(&bars, 8, 2.0);
        assert_eq!(out.middle.len(), 1);
        assert!((out.middle[0].value - 5.0).abs() < 1e-10);
        assert!((out.upper[0].value - 9.0).abs() < 1e-10);
        assert!((out.lower[0].value - 1.0).abs() < 1e-10);
    }
}
