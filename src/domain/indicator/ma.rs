//! Simple moving average with a shrinking warm-up window.
//!
//! MA[i] = mean of the trailing min(period, i+1) values. No bar is ever
//! invalid: the first (period-1) bars average over what is available.

/// O(n) running-sum implementation. Returns an empty vector for empty input
/// or a zero period.
pub fn compute_ma(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::with_capacity(series.len());
    let mut sum = 0.0;

    for (i, &value) in series.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= series[i - period];
        }
        let window = (i + 1).min(period);
        values.push(sum / window as f64);
    }

    values
}
