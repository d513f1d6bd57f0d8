//! MACD (Moving Average Convergence Divergence).
//!
//! DIF = EMA(fast) - EMA(slow)
//! DEA = EMA(signal) of DIF
//! BAR = DIF - DEA
//!
//! Default parameters: fast=12, slow=26, signal=9

use crate::domain::indicator::ema::compute_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub bar: Vec<f64>,
}

pub fn compute_macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if close.is_empty() || fast == 0 || slow == 0 || signal == 0 {
        return MacdSeries::default();
    }

    let ema_fast = compute_ema(close, fast);
    let ema_slow = compute_ema(close, slow);

    let dif: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let dea = compute_ema(&dif, signal);
    let bar = dif.iter().zip(dea.iter()).map(|(d, e)| d - e).collect();

    MacdSeries { dif, dea, bar }
}
