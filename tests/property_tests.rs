//! Property tests for indicator and signal invariants.
//!
//! Uses proptest to verify:
//! 1. Constant series: MA and EMA reproduce the constant
//! 2. Run lengths: sign1 follows the sign of the regime and counts consecutive bars
//! 3. Frame alignment: every derived array matches the bar count
//! 4. Signal alternation: buys and sells alternate, starting with a buy
//! 5. Progress: never decreases as instruments complete

mod common;

use common::make_bars;
use ladderquant::domain::indicator::{
    compute_ema, compute_indicator_frame, compute_ma, compute_sign1, IndicatorConfig,
};
use ladderquant::domain::signal::{run_signal_pipeline, SignalType};
use ladderquant::domain::strategy::Strategy as Ladder;
use ladderquant::domain::task::progress_percent;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 1..120)
}

fn arb_position() -> impl Strategy<Value = Vec<i8>> {
    prop::collection::vec(-1i8..=1, 1..200)
}

// ── 1. Constant series ───────────────────────────────────────────────

proptest! {
    #[test]
    fn constant_series_is_fixed_point(
        value in 0.01..10_000.0_f64,
        len in 1usize..150,
        period in 1usize..60,
    ) {
        let series = vec![value; len];
        for v in compute_ma(&series, period) {
            prop_assert!((v - value).abs() <= value * 1e-12);
        }
        for v in compute_ema(&series, period) {
            prop_assert!((v - value).abs() <= value * 1e-12);
        }
    }
}

// ── 2. Run lengths ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn sign1_tracks_regime(position in arb_position()) {
        let run = compute_sign1(&position);
        prop_assert_eq!(run.len(), position.len());
        for i in 0..position.len() {
            prop_assert_eq!(run[i].signum(), position[i] as i64);
            if i > 0 && position[i] != 0 && position[i] == position[i - 1] {
                prop_assert_eq!(run[i].abs(), run[i - 1].abs() + 1);
            } else if position[i] != 0 {
                prop_assert_eq!(run[i].abs(), 1);
            }
        }
    }

    #[test]
    fn bullish_stack_counts_up(len in 1usize..300) {
        let run = compute_sign1(&vec![1i8; len]);
        let expected: Vec<i64> = (1..=len as i64).collect();
        prop_assert_eq!(run, expected);
    }
}

// ── 3. Frame alignment ───────────────────────────────────────────────

proptest! {
    #[test]
    fn frame_arrays_match_bar_count(closes in arb_closes()) {
        let bars = make_bars(&closes);
        let frame = compute_indicator_frame(&bars, &IndicatorConfig::default());
        let n = bars.len();

        prop_assert_eq!(frame.len(), n);
        for len in [
            frame.timestamps.len(), frame.high.len(), frame.low.len(), frame.volume.len(),
            frame.ma_s.len(), frame.ma_m.len(), frame.ma_l.len(), frame.ma_x.len(),
            frame.volume_ma_s.len(), frame.volume_ma_m.len(),
            frame.volume_ma_l.len(), frame.volume_ma_x.len(),
            frame.position.len(), frame.sign1.len(), frame.sign2.len(),
            frame.trend_alignment.len(),
            frame.dif.len(), frame.dea.len(), frame.bar.len(),
            frame.kdj_k.len(), frame.kdj_d.len(), frame.kdj_j.len(),
        ] {
            prop_assert_eq!(len, n);
        }
        prop_assert!(frame.ma_s.iter().chain(&frame.dif).chain(&frame.kdj_k).all(|v| v.is_finite()));
    }
}

// ── 4. Signal alternation ────────────────────────────────────────────

proptest! {
    #[test]
    fn signals_alternate(closes in arb_closes()) {
        let bars = make_bars(&closes);
        let frame = compute_indicator_frame(&bars, &IndicatorConfig::default());
        let ladder = Ladder::parse("p", "MAS_GT_MAM; VOLUME_HIGH", "OR(MAS_LT_MAM, KDJ_OVERBOUGHT)").unwrap();

        let out = run_signal_pipeline(&frame, &ladder.buy, &ladder.sell);
        for (i, s) in out.signals.iter().enumerate() {
            let expected = if i % 2 == 0 { SignalType::Buy } else { SignalType::Sell };
            prop_assert_eq!(s.signal_type, expected);
        }
        prop_assert!(out.signals.windows(2).all(|w| w[0].index < w[1].index));
        prop_assert_eq!(out.transactions.len(), out.signals.len() / 2);
        prop_assert_eq!(out.summary.open_position, out.signals.len() % 2 == 1);
        prop_assert_eq!(
            out.summary.profit_trades + out.summary.loss_trades,
            out.summary.total_trades
        );
    }
}

// ── 5. Progress ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn progress_is_monotonic(total in 1usize..500) {
        let mut last = 0u8;
        for done in 0..=total {
            let p = progress_percent(done, total);
            prop_assert!(p >= last);
            prop_assert!(p <= 100);
            last = p;
        }
        prop_assert_eq!(last, 100);
    }
}
