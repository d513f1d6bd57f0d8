//! KDJ stochastic oscillator.
//!
//! RSV[i] = (C - LLV(L, n)) / (HHV(H, n) - LLV(L, n)) * 100 over the trailing
//! min(n, i+1) bars (50 when the range is flat).
//! K = ((k_smooth-1) * K[i-1] + RSV) / k_smooth, D likewise over K, both seeded at 50.
//! J = 3K - 2D.

pub const DEFAULT_PERIOD: usize = 9;
pub const DEFAULT_K_SMOOTH: usize = 3;
pub const DEFAULT_D_SMOOTH: usize = 3;

const SEED: f64 = 50.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KdjSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

pub fn compute_kdj(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> KdjSeries {
    let n = close.len();
    if n == 0 || high.len() != n || low.len() != n || period == 0 || k_smooth == 0 || d_smooth == 0
    {
        return KdjSeries::default();
    }

    let mut series = KdjSeries {
        k: Vec::with_capacity(n),
        d: Vec::with_capacity(n),
        j: Vec::with_capacity(n),
    };
    let mut k_prev = SEED;
    let mut d_prev = SEED;

    for i in 0..n {
        let start = (i + 1).saturating_sub(period);
        let hhv = high[start..=i].iter().copied().fold(f64::MIN, f64::max);
        let llv = low[start..=i].iter().copied().fold(f64::MAX, f64::min);
        let range = hhv - llv;
        let rsv = if range > 0.0 {
            (close[i] - llv) / range * 100.0
        } else {
            SEED
        };

        let k = ((k_smooth - 1) as f64 * k_prev + rsv) / k_smooth as f64;
        let d = ((d_smooth - 1) as f64 * d_prev + k) / d_smooth as f64;
        series.k.push(k);
        series.d.push(d);
        series.j.push(3.0 * k - 2.0 * d);
        k_prev = k;
        d_prev = d;
    }

    series
}
