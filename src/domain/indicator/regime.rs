//! Moving-average regime metrics: ordering, run length and dispersion.

/// +1 when maS > maM > maL, -1 when maS < maM < maL, otherwise 0.
pub fn compute_position(ma_s: &[f64], ma_m: &[f64], ma_l: &[f64]) -> Vec<i8> {
    ma_s.iter()
        .zip(ma_m)
        .zip(ma_l)
        .map(|((&s, &m), &l)| {
            if s > m && m > l {
                1
            } else if s < m && m < l {
                -1
            } else {
                0
            }
        })
        .collect()
}

/// Signed run length of a tri-state regime series.
///
/// A positive run grows while the regime stays positive, a negative run shrinks
/// while it stays negative; any change (or a neutral bar) restarts from the raw sign.
pub fn signed_run_length(regime: &[i8]) -> Vec<i64> {
    let mut runs: Vec<i64> = Vec::with_capacity(regime.len());

    for (i, &sign) in regime.iter().enumerate() {
        let current = i64::from(sign);
        let run = if i == 0 {
            current
        } else {
            let prev = runs[i - 1];
            if prev > 0 && current > 0 {
                prev + 1
            } else if prev < 0 && current < 0 {
                prev - 1
            } else {
                current
            }
        };
        runs.push(run);
    }

    runs
}

/// sign1: run length of the short/middle/long ordering regime.
pub fn compute_sign1(position: &[i8]) -> Vec<i64> {
    signed_run_length(position)
}

/// sign2: (max - min) / min across the three core moving averages.
pub fn compute_sign2(ma_s: &[f64], ma_m: &[f64], ma_l: &[f64]) -> Vec<f64> {
    ma_s.iter()
        .zip(ma_m)
        .zip(ma_l)
        .map(|((&s, &m), &l)| {
            let max = s.max(m).max(l);
            let min = s.min(m).min(l);
            (max - min) / min
        })
        .collect()
}

/// Run length of 4-MA monotone stacking (>= bullish, <= bearish).
pub fn compute_trend_alignment(
    ma_s: &[f64],
    ma_m: &[f64],
    ma_l: &[f64],
    ma_x: &[f64],
) -> Vec<i64> {
    let stacking: Vec<i8> = ma_s
        .iter()
        .zip(ma_m)
        .zip(ma_l)
        .zip(ma_x)
        .map(|(((&s, &m), &l), &x)| {
            if s >= m && m >= l && l >= x {
                1
            } else if s <= m && m <= l && l <= x {
                -1
            } else {
                0
            }
        })
        .collect();
    signed_run_length(&stacking)
}
