// =============================================================================
// Bar Aggregator — authoritative daily-bar sequence for one instrument
// =============================================================================
//
// Owns the single canonical OHLCV sequence for the currently selected
// instrument. The sequence is seeded once from the historical batch and then
// extended/mutated by live ticks. Only the most recent ("open") bar is ever
// mutated in place; once a later bucket exists, earlier buckets are frozen.
// =============================================================================

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Tick;

/// One OHLCV record for a single calendar-date bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Build the first bar of a new bucket from a tick. The tick's open
    /// becomes the bar's open and is never altered afterwards.
    fn from_tick(date: NaiveDate, tick: &Tick) -> Self {
        Self {
            date,
            open: tick.open,
            high: tick.high,
            low: tick.low,
            close: tick.close,
            volume: tick.volume,
        }
    }
}

/// Maintains the bar sequence for the active instrument and merges incoming
/// ticks correctly regardless of their arrival order relative to the
/// historical seed.
///
/// Not ready until [`seed`](Self::seed) has been called; ticks merged before
/// that are dropped (the session controller queues them instead of calling
/// in here). Consumers read the sequence via [`bars`](Self::bars) and must
/// not retain the view across a later mutation.
#[derive(Debug, Default)]
pub struct BarAggregator {
    bars: Vec<Bar>,
    ready: bool,
}

impl BarAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the historical seed has been applied.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Replace the sequence wholesale with the historical batch.
    ///
    /// The batch is sorted by date before acceptance — the collaborator is
    /// not trusted to deliver it sorted. An empty batch still marks the
    /// aggregator ready: the first live tick then creates the first bar.
    pub fn seed(&mut self, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.date);
        debug!(bars = bars.len(), "seeding bar sequence");
        self.bars = bars;
        self.ready = true;
    }

    /// Discard the sequence and return to the not-ready state.
    pub fn reset(&mut self) {
        self.bars.clear();
        self.ready = false;
    }

    /// Merge a live tick into the bucket for today's UTC date.
    pub fn merge_tick(&mut self, tick: &Tick) {
        self.merge_tick_on(tick, Utc::now().date_naive());
    }

    /// Merge a tick into an explicit bucket.
    ///
    /// Resolution, in order:
    /// 1. Not ready — drop the tick.
    /// 2. Empty sequence — the tick becomes the first bar.
    /// 3. Bucket matches the last bar — update it in place: high/low extend,
    ///    close replaces, volume accumulates, open stays.
    /// 4. Bucket is newer than the last bar — append a new bar.
    /// 5. Bucket is older than the last bar — discard; frozen buckets never
    ///    reopen.
    pub fn merge_tick_on(&mut self, tick: &Tick, bucket: NaiveDate) {
        if !self.ready {
            debug!(symbol = %tick.symbol, "tick dropped: aggregator not seeded");
            return;
        }

        // Guard against any external unsorted state before comparing against
        // the final bar. Stable, so equal dates keep their relative order.
        self.bars.sort_by_key(|b| b.date);

        if self.bars.is_empty() {
            self.bars.push(Bar::from_tick(bucket, tick));
            return;
        }

        let last_idx = self.bars.len() - 1;
        let last_date = self.bars[last_idx].date;

        if bucket == last_date {
            let last = &mut self.bars[last_idx];
            last.high = last.high.max(tick.high);
            last.low = last.low.min(tick.low);
            last.close = tick.close;
            last.volume += tick.volume;
        } else if bucket > last_date {
            self.bars.push(Bar::from_tick(bucket, tick));
        } else {
            debug!(
                symbol = %tick.symbol,
                bucket = %bucket,
                last = %last_date,
                "stale tick discarded"
            );
        }
    }

    /// Read-only view of the present sequence, ascending by date.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(d: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Bar {
        Bar {
            date: d,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn tick(open: f64, high: f64, low: f64, close: f64, volume: u64) -> Tick {
        Tick {
            symbol: "VIC".into(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn tick_before_seed_is_dropped() {
        let mut agg = BarAggregator::new();
        agg.merge_tick_on(&tick(10.0, 11.0, 9.0, 10.5, 100), date(2024, 1, 2));
        assert!(!agg.is_ready());
        assert!(agg.bars().is_empty());
    }

    #[test]
    fn seed_sorts_unsorted_input() {
        let mut agg = BarAggregator::new();
        agg.seed(vec![
            bar(date(2024, 1, 3), 1.0, 1.0, 1.0, 1.0, 1),
            bar(date(2024, 1, 1), 2.0, 2.0, 2.0, 2.0, 2),
            bar(date(2024, 1, 2), 3.0, 3.0, 3.0, 3.0, 3),
        ]);
        let dates: Vec<NaiveDate> = agg.bars().iter().map(|b| b.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]
        );
    }

    #[test]
    fn empty_seed_marks_ready_and_first_tick_creates_bar() {
        let mut agg = BarAggregator::new();
        agg.seed(Vec::new());
        assert!(agg.is_ready());
        assert!(agg.bars().is_empty());

        agg.merge_tick_on(&tick(10.0, 11.0, 9.0, 10.5, 100), date(2024, 1, 2));
        assert_eq!(agg.bars().len(), 1);
        let b = &agg.bars()[0];
        assert_eq!(b.date, date(2024, 1, 2));
        assert!((b.open - 10.0).abs() < f64::EPSILON);
        assert_eq!(b.volume, 100);
    }

    #[test]
    fn same_bucket_merges_in_place() {
        let mut agg = BarAggregator::new();
        agg.seed(Vec::new());
        let d = date(2024, 1, 2);

        agg.merge_tick_on(&tick(10.0, 11.0, 9.0, 10.5, 100), d);
        agg.merge_tick_on(&tick(10.5, 12.0, 10.0, 11.5, 50), d);

        assert_eq!(agg.bars().len(), 1);
        let b = &agg.bars()[0];
        // Open comes from the first tick of the bucket, close from the last.
        assert!((b.open - 10.0).abs() < f64::EPSILON);
        assert!((b.high - 12.0).abs() < f64::EPSILON);
        assert!((b.low - 9.0).abs() < f64::EPSILON);
        assert!((b.close - 11.5).abs() < f64::EPSILON);
        assert_eq!(b.volume, 150);
    }

    #[test]
    fn newer_bucket_appends() {
        let mut agg = BarAggregator::new();
        agg.seed(vec![bar(date(2024, 1, 1), 10.0, 11.0, 9.0, 10.0, 100)]);
        agg.merge_tick_on(&tick(10.0, 12.0, 10.0, 11.0, 200), date(2024, 1, 2));

        assert_eq!(agg.bars().len(), 2);
        assert_eq!(agg.bars()[1].date, date(2024, 1, 2));
    }

    #[test]
    fn stale_tick_never_changes_sequence() {
        let mut agg = BarAggregator::new();
        agg.seed(vec![
            bar(date(2024, 1, 1), 10.0, 11.0, 9.0, 10.0, 100),
            bar(date(2024, 1, 2), 10.0, 12.0, 10.0, 11.0, 200),
        ]);
        let before = agg.bars().to_vec();

        // Applying a stale tick any number of times leaves the sequence
        // byte-for-byte identical.
        for _ in 0..3 {
            agg.merge_tick_on(&tick(99.0, 99.0, 1.0, 50.0, 999), date(2024, 1, 1));
            assert_eq!(agg.bars(), before.as_slice());
        }
    }

    #[test]
    fn zero_volume_tick_merges_normally() {
        let mut agg = BarAggregator::new();
        agg.seed(Vec::new());
        let d = date(2024, 1, 2);

        agg.merge_tick_on(&tick(10.0, 11.0, 9.0, 10.5, 100), d);
        agg.merge_tick_on(&tick(10.5, 13.0, 8.0, 10.0, 0), d);

        let b = &agg.bars()[0];
        assert_eq!(b.volume, 100);
        assert!((b.high - 13.0).abs() < f64::EPSILON);
        assert!((b.low - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_bar_per_bucket_strictly_ascending() {
        let mut agg = BarAggregator::new();
        agg.seed(Vec::new());

        let buckets = [
            date(2024, 1, 1),
            date(2024, 1, 1),
            date(2024, 1, 2),
            date(2024, 1, 4),
            date(2024, 1, 4),
            date(2024, 1, 3), // stale — must not appear
        ];
        for (i, d) in buckets.iter().enumerate() {
            agg.merge_tick_on(&tick(10.0, 11.0 + i as f64, 9.0, 10.5, 10), *d);
        }

        let dates: Vec<NaiveDate> = agg.bars().iter().map(|b| b.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 4)]
        );
        for pair in dates.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn seeded_sequence_merges_live_tick() {
        let mut agg = BarAggregator::new();
        agg.seed(vec![
            bar(date(2024, 1, 1), 10.0, 11.0, 9.0, 10.0, 100),
            bar(date(2024, 1, 2), 10.0, 12.0, 10.0, 11.0, 200),
        ]);

        agg.merge_tick_on(&tick(11.0, 13.0, 10.0, 12.0, 50), date(2024, 1, 2));

        assert_eq!(agg.bars().len(), 2);
        let last = agg.bars().last().unwrap();
        assert_eq!(last.date, date(2024, 1, 2));
        assert!((last.open - 10.0).abs() < f64::EPSILON);
        assert!((last.high - 13.0).abs() < f64::EPSILON);
        assert!((last.low - 10.0).abs() < f64::EPSILON);
        assert!((last.close - 12.0).abs() < f64::EPSILON);
        assert_eq!(last.volume, 250);
    }

    #[test]
    fn reset_returns_to_not_ready() {
        let mut agg = BarAggregator::new();
        agg.seed(vec![bar(date(2024, 1, 1), 10.0, 11.0, 9.0, 10.0, 100)]);
        agg.reset();
        assert!(!agg.is_ready());
        assert!(agg.bars().is_empty());

        // Ticks after a reset are dropped again until the next seed.
        agg.merge_tick_on(&tick(10.0, 11.0, 9.0, 10.5, 100), date(2024, 1, 2));
        assert!(agg.bars().is_empty());
    }
}
