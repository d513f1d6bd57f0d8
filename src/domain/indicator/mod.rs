//! Technical indicator engine.
//!
//! Turns a price bar series into an [`IndicatorFrame`]: parallel arrays aligned
//! index-for-index with the source bars. Every array in a frame has the same
//! length as the input; warm-up bars use shrinking windows instead of gaps.

pub mod ema;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod regime;

pub use ema::compute_ema;
pub use kdj::{compute_kdj, KdjSeries};
pub use ma::compute_ma;
pub use macd::{compute_macd, MacdSeries};
pub use regime::{
    compute_position, compute_sign1, compute_sign2, compute_trend_alignment, signed_run_length,
};

use crate::domain::price_bar::PriceBar;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaPeriods {
    pub short: usize,
    pub middle: usize,
    pub long: usize,
    pub extra: usize,
}

impl Default for MaPeriods {
    fn default() -> Self {
        Self {
            short: 7,
            middle: 14,
            long: 50,
            extra: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacdPeriods {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdPeriods {
    fn default() -> Self {
        Self {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KdjPeriods {
    pub period: usize,
    pub k_smooth: usize,
    pub d_smooth: usize,
}

impl Default for KdjPeriods {
    fn default() -> Self {
        Self {
            period: kdj::DEFAULT_PERIOD,
            k_smooth: kdj::DEFAULT_K_SMOOTH,
            d_smooth: kdj::DEFAULT_D_SMOOTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorConfig {
    pub ma: MaPeriods,
    pub macd: MacdPeriods,
    pub kdj: KdjPeriods,
}

/// Derived per-bar arrays aligned with a price bar sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,

    pub ma_s: Vec<f64>,
    pub ma_m: Vec<f64>,
    pub ma_l: Vec<f64>,
    pub ma_x: Vec<f64>,
    pub volume_ma_s: Vec<f64>,
    pub volume_ma_m: Vec<f64>,
    pub volume_ma_l: Vec<f64>,
    pub volume_ma_x: Vec<f64>,

    pub position: Vec<i8>,
    pub sign1: Vec<i64>,
    pub sign2: Vec<f64>,
    pub trend_alignment: Vec<i64>,

    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub bar: Vec<f64>,

    pub kdj_k: Vec<f64>,
    pub kdj_d: Vec<f64>,
    pub kdj_j: Vec<f64>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

pub fn compute_indicator_frame(bars: &[PriceBar], config: &IndicatorConfig) -> IndicatorFrame {
    if bars.is_empty() {
        return IndicatorFrame::default();
    }

    let timestamps: Vec<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let ma = &config.ma;
    let ma_s = compute_ma(&close, ma.short);
    let ma_m = compute_ma(&close, ma.middle);
    let ma_l = compute_ma(&close, ma.long);
    let ma_x = compute_ma(&close, ma.extra);

    let position = compute_position(&ma_s, &ma_m, &ma_l);
    let sign1 = compute_sign1(&position);
    let sign2 = compute_sign2(&ma_s, &ma_m, &ma_l);
    let trend_alignment = compute_trend_alignment(&ma_s, &ma_m, &ma_l, &ma_x);

    let MacdSeries { dif, dea, bar } = compute_macd(
        &close,
        config.macd.fast,
        config.macd.slow,
        config.macd.signal,
    );
    let KdjSeries { k, d, j } = compute_kdj(
        &high,
        &low,
        &close,
        config.kdj.period,
        config.kdj.k_smooth,
        config.kdj.d_smooth,
    );

    IndicatorFrame {
        volume_ma_s: compute_ma(&volume, ma.short),
        volume_ma_m: compute_ma(&volume, ma.middle),
        volume_ma_l: compute_ma(&volume, ma.long),
        volume_ma_x: compute_ma(&volume, ma.extra),
        timestamps,
        high,
        low,
        close,
        volume,
        ma_s,
        ma_m,
        ma_l,
        ma_x,
        position,
        sign1,
        sign2,
        trend_alignment,
        dif,
        dea,
        bar,
        kdj_k: k,
        kdj_d: d,
        kdj_j: j,
    }
}
