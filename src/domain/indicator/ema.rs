//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first value, then EMA[i] = (x[i] - EMA[i-1]) * k + EMA[i-1].
//! Defined from the first bar onwards; there is no warm-up gap.

pub fn compute_ema(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(series.len());
    let mut ema = series[0];
    values.push(ema);

    for &value in &series[1..] {
        ema = (value - ema) * k + ema;
        values.push(ema);
    }

    values
}
