// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the first data point itself, not
// with an SMA of the first `period` values. That keeps the series full-length
// and the implementation trivial, at the cost of accuracy over the initial
// segment: early values are only trustworthy once the series has run for
// several periods. This seeding rule is applied uniformly everywhere an EMA
// is taken (including the MACD signal line) — a documented property of this
// engine, not a bug to fix in one place.
// =============================================================================

/// Compute the full-length EMA series for `values` with look-back `period`.
///
/// The output has exactly one element per input element; `out[0]` is the
/// seed `values[0]`.
///
/// # Edge cases
/// - `period == 0` => empty vec (division by zero guard)
/// - empty input => empty vec
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    result.push(values[0]);

    let mut prev = values[0];
    for &value in &values[1..] {
        let ema = value * k + prev * (1.0 - k);
        result.push(ema);
        prev = ema;
    }

    result
}
