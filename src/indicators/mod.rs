// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free computations over an ordered bar sequence. Nothing
// in here holds state between calls: every recomputation takes the full
// sequence plus the current configuration and rebuilds every derived series
// from scratch. Bar counts are small (a few thousand at most), so the
// simplicity of a wholesale recompute beats incremental bookkeeping.
// =============================================================================

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::market_data::Bar;

// =============================================================================
// Derived series
// =============================================================================

/// One value of a derived series, aligned to a bar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A named derived series. A parameter error (non-positive period, period
/// larger than the bar count) yields a series with no points rather than an
/// error, so the remaining indicators stay usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub name: String,
    pub points: Vec<IndicatorPoint>,
}

// =============================================================================
// Configuration
// =============================================================================

/// One moving-average overlay line on the price pane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaOverlay {
    pub period: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiConfig {
    pub visible: bool,
    pub period: usize,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            visible: false,
            period: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdConfig {
    pub visible: bool,
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            visible: false,
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerConfig {
    pub visible: bool,
    pub period: usize,
    pub std_dev: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            visible: false,
            period: 20,
            std_dev: 2.0,
        }
    }
}

/// Per-indicator parameters plus visibility flags, mutated by the user via
/// the API. Changing it triggers a recomputation but never touches the bar
/// sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub ma_overlays: Vec<MaOverlay>,
    #[serde(default)]
    pub rsi: RsiConfig,
    #[serde(default)]
    pub macd: MacdConfig,
    #[serde(default)]
    pub bollinger: BollingerConfig,
}

// =============================================================================
// Recomputation entry point
// =============================================================================

/// Map the current bar sequence and configuration to the full set of derived
/// series the charting surface should draw.
///
/// Series names are stable keys: `SMA(n)`, `RSI(n)`, `MACD(f,s,g)`,
/// `MACD_SIGNAL(f,s,g)`, `MACD_HIST(f,s,g)`, `BB_UPPER(n,k)`,
/// `BB_MIDDLE(n,k)`, `BB_LOWER(n,k)`.
pub fn compute_all(bars: &[Bar], config: &IndicatorConfig) -> Vec<IndicatorSeries> {
    let mut series = Vec::new();

    for overlay in &config.ma_overlays {
        series.push(IndicatorSeries {
            name: format!("SMA({})", overlay.period),
            points: sma::sma(bars, overlay.period),
        });
    }

    if config.bollinger.visible {
        let bb = bollinger::bollinger(bars, config.bollinger.period, config.bollinger.std_dev);
        let suffix = format!("({},{})", config.bollinger.period, config.bollinger.std_dev);
        series.push(IndicatorSeries {
            name: format!("BB_UPPER{suffix}"),
            points: bb.upper,
        });
        series.push(IndicatorSeries {
            name: format!("BB_MIDDLE{suffix}"),
            points: bb.middle,
        });
        series.push(IndicatorSeries {
            name: format!("BB_LOWER{suffix}"),
            points: bb.lower,
        });
    }

    if config.macd.visible {
        let m = macd::macd(bars, config.macd.fast, config.macd.slow, config.macd.signal);
        let suffix = format!(
            "({},{},{})",
            config.macd.fast, config.macd.slow, config.macd.signal
        );
        series.push(IndicatorSeries {
            name: format!("MACD{suffix}"),
            points: m.macd,
        });
        series.push(IndicatorSeries {
            name: format!("MACD_SIGNAL{suffix}"),
            points: m.signal,
        });
        series.push(IndicatorSeries {
            name: format!("MACD_HIST{suffix}"),
            points: m.histogram,
        });
    }

    if config.rsi.visible {
        series.push(IndicatorSeries {
            name: format!("RSI({})", config.rsi.period),
            points: rsi::rsi(bars, config.rsi.period),
        });
    }

    series
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Build a bar sequence with consecutive dates and the given closes.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Days::new(i as u64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1_000,
            })
            .collect()
    }

    #[test]
    fn default_config_produces_nothing() {
        let bars = bars_from_closes(&(1..=60).map(|x| x as f64).collect::<Vec<_>>());
        assert!(compute_all(&bars, &IndicatorConfig::default()).is_empty());
    }

    #[test]
    fn full_config_produces_all_series() {
        let bars = bars_from_closes(&(1..=60).map(|x| x as f64).collect::<Vec<_>>());
        let config = IndicatorConfig {
            ma_overlays: vec![MaOverlay { period: 20 }, MaOverlay { period: 50 }],
            rsi: RsiConfig {
                visible: true,
                period: 14,
            },
            macd: MacdConfig {
                visible: true,
                ..Default::default()
            },
            bollinger: BollingerConfig {
                visible: true,
                ..Default::default()
            },
        };

        let series = compute_all(&bars, &config);
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SMA(20)",
                "SMA(50)",
                "BB_UPPER(20,2)",
                "BB_MIDDLE(20,2)",
                "BB_LOWER(20,2)",
                "MACD(12,26,9)",
                "MACD_SIGNAL(12,26,9)",
                "MACD_HIST(12,26,9)",
                "RSI(14)"
            ]
        );
        for s in &series {
            assert!(!s.points.is_empty(), "series {} is empty", s.name);
        }
    }

    #[test]
    fn invalid_parameter_empties_only_that_series() {
        let bars = bars_from_closes(&(1..=60).map(|x| x as f64).collect::<Vec<_>>());
        let config = IndicatorConfig {
            // Period longer than the sequence: empty series, not a failure.
            ma_overlays: vec![MaOverlay { period: 500 }],
            rsi: RsiConfig {
                visible: true,
                period: 14,
            },
            ..Default::default()
        };

        let series = compute_all(&bars, &config);
        assert_eq!(series.len(), 2);
        assert!(series[0].points.is_empty());
        assert!(!series[1].points.is_empty());
    }

    #[test]
    fn series_realign_to_the_current_sequence() {
        let long = bars_from_closes(&(1..=40).map(|x| x as f64).collect::<Vec<_>>());
        let short = bars_from_closes(&(1..=25).map(|x| x as f64).collect::<Vec<_>>());
        let config = IndicatorConfig {
            ma_overlays: vec![MaOverlay { period: 20 }],
            ..Default::default()
        };

        let before = compute_all(&long, &config);
        let after = compute_all(&short, &config);
        assert_eq!(before[0].points.len(), 21);
        assert_eq!(after[0].points.len(), 6);
        // Every point of the recomputed series references a bar that exists.
        for p in &after[0].points {
            assert!(short.iter().any(|b| b.date == p.date));
        }
    }
}
