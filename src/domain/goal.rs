//! Goal detector: profitable price swings found by extrema and slope scans.
//!
//! Two independent markers flag candidate turning points on a day series:
//!
//! - windowed extrema: a bar whose low (high) is the minimum (maximum) over
//!   `[i - r, i + r]`
//! - slope regression: the least-squares slope of the trailing `r/2` closes
//!   crosses from non-positive to above the threshold (trend start) or from
//!   non-negative to below its negation (trend end)
//!
//! Flagged bars are walked in order; every start immediately followed by an
//! end becomes a candidate, which is then measured, filtered and categorised.

use crate::domain::price_bar::{elapsed_days, PriceBar};
use chrono::NaiveDateTime;
use serde::Serialize;

const HISTORY_BARS: usize = 60;
const NEW_HIGH_RATIO: f64 = 1.05;
const REBOUND_RATIO: f64 = 1.1;
const MIN_LIQUIDITY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalConfig {
    pub window_radius: usize,
    pub slope_threshold: f64,
    pub profit_filter: f64,
    pub daily_profit_filter: f64,
    pub duration_filter: f64,
    pub liquidity_filter: f64,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            window_radius: 40,
            slope_threshold: 0.5,
            profit_filter: 50.0,
            daily_profit_filter: 2.0,
            duration_filter: 7.0,
            liquidity_filter: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendMarker {
    pub extremum_low: bool,
    pub extremum_high: bool,
    pub slope_trend_start: bool,
    pub slope_trend_end: bool,
}

impl TrendMarker {
    pub fn is_start(&self) -> bool {
        self.extremum_low || self.slope_trend_start
    }

    pub fn is_end(&self) -> bool {
        self.extremum_high || self.slope_trend_end
    }

    pub fn is_flagged(&self) -> bool {
        self.is_start() || self.is_end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendCategory {
    NewHigh,
    Rebound,
    Normal,
}

impl std::fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TrendCategory::NewHigh => "NEW_HIGH",
            TrendCategory::Rebound => "REBOUND",
            TrendCategory::Normal => "NORMAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Buy,
    Sell,
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            GoalType::Buy => "buy",
            GoalType::Sell => "sell",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LiquidityStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl LiquidityStats {
    /// `None` when the span is empty or carries no liquidity at all.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() || values.iter().all(|&v| v == 0.0) {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            avg: values.iter().sum::<f64>() / values.len() as f64,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: sorted[sorted.len() / 2],
        })
    }

    fn is_finite(&self) -> bool {
        [self.avg, self.min, self.max, self.median]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub index: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub start_price: f64,
    pub end_price: f64,
    pub goal_type: GoalType,
    pub profit_percent: f64,
    pub duration_days: f64,
    pub daily_profit_percent: f64,
    pub trend_category: TrendCategory,
    pub liquidity_stats: LiquidityStats,
    pub used_slope_analysis: bool,
}

/// Ordinary least-squares slope of `values` against their index.
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (x, &y)| {
            let dx = x as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    if den != 0.0 { num / den } else { 0.0 }
}

pub fn scan_extrema(bars: &[PriceBar], window_radius: usize) -> Vec<TrendMarker> {
    let n = bars.len();
    (0..n)
        .map(|i| {
            let window = &bars[i.saturating_sub(window_radius)..(i + window_radius + 1).min(n)];
            let local_max = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let local_min = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            TrendMarker {
                extremum_low: bars[i].low == local_min,
                extremum_high: bars[i].high == local_max,
                ..TrendMarker::default()
            }
        })
        .collect()
}

pub fn scan_slope(bars: &[PriceBar], window_radius: usize, slope_threshold: f64) -> Vec<TrendMarker> {
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let half = window_radius / 2;

    (0..close.len())
        .map(|i| {
            if i < half {
                return TrendMarker::default();
            }
            let slope = ols_slope(&close[i - half..=i]);
            let prev = ols_slope(&close[i.saturating_sub(half + 1)..i]);
            TrendMarker {
                slope_trend_start: slope > slope_threshold && (i == 0 || prev <= 0.0),
                slope_trend_end: slope < -slope_threshold && (i == 0 || prev >= 0.0),
                ..TrendMarker::default()
            }
        })
        .collect()
}

/// Combined extrema and slope markers per bar.
pub fn mark_trends(bars: &[PriceBar], window_radius: usize, slope_threshold: f64) -> Vec<TrendMarker> {
    scan_extrema(bars, window_radius)
        .into_iter()
        .zip(scan_slope(bars, window_radius, slope_threshold))
        .map(|(ext, slope)| TrendMarker {
            slope_trend_start: slope.slope_trend_start,
            slope_trend_end: slope.slope_trend_end,
            ..ext
        })
        .collect()
}

fn categorize(bars: &[PriceBar], start: usize, start_low: f64, end_high: f64) -> TrendCategory {
    let history = &bars[start.saturating_sub(HISTORY_BARS)..start];
    if history.is_empty() {
        return TrendCategory::Normal;
    }
    let hist_high = history.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let hist_low = history.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    if end_high > hist_high * NEW_HIGH_RATIO {
        TrendCategory::NewHigh
    } else if start_low < hist_low * REBOUND_RATIO {
        TrendCategory::Rebound
    } else {
        TrendCategory::Normal
    }
}

pub fn calculate_goals(bars: &[PriceBar], config: &GoalConfig) -> Vec<Goal> {
    let markers = mark_trends(bars, config.window_radius, config.slope_threshold);
    let flagged: Vec<usize> = markers
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_flagged())
        .map(|(i, _)| i)
        .collect();

    let mut goals = Vec::new();
    for pair in flagged.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if !markers[start].is_start() || !markers[end].is_end() {
            continue;
        }

        let (current, next) = (&bars[start], &bars[end]);
        let duration = elapsed_days(current.timestamp, next.timestamp);
        if !duration.is_finite() || duration <= 0.0 {
            continue;
        }

        let profit = if current.low > 0.0 {
            (next.high - current.low) / current.low * 100.0
        } else {
            0.0
        };
        let daily_profit = profit / duration;
        if !profit.is_finite() || !daily_profit.is_finite() {
            continue;
        }

        let liquidity: Vec<f64> = bars[start..=end]
            .iter()
            .map(|b| {
                let l = b.liquidity();
                if l.is_finite() { l } else { 0.0 }
            })
            .collect();
        let Some(stats) = LiquidityStats::from_values(&liquidity) else {
            continue;
        };
        if !stats.is_finite() {
            continue;
        }

        if profit < config.profit_filter
            || daily_profit < config.daily_profit_filter
            || duration < config.duration_filter
            || stats.avg < config.liquidity_filter
            || stats.min < config.liquidity_filter * MIN_LIQUIDITY_RATIO
        {
            continue;
        }

        goals.push(Goal {
            index: goals.len(),
            start_time: current.timestamp,
            end_time: next.timestamp,
            start_price: current.low,
            end_price: next.high,
            goal_type: if current.low < next.high {
                GoalType::Buy
            } else {
                GoalType::Sell
            },
            profit_percent: profit,
            duration_days: duration,
            daily_profit_percent: daily_profit,
            trend_category: categorize(bars, start, current.low, next.high),
            liquidity_stats: stats,
            used_slope_analysis: markers[start].slope_trend_start || markers[end].slope_trend_end,
        });
    }

    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn bars_from_close(close: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        close
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 10_000.0,
            })
            .collect()
    }

    fn v_shape() -> Vec<f64> {
        let mut close: Vec<f64> = (0..=10).map(|i| 20.0 - i as f64).collect();
        close.extend((1..=10).map(|i| 10.0 + 2.0 * i as f64));
        close
    }

    fn loose_config() -> GoalConfig {
        GoalConfig {
            window_radius: 40,
            slope_threshold: 0.5,
            profit_filter: 0.0,
            daily_profit_filter: 0.0,
            duration_filter: 0.0,
            liquidity_filter: 0.0,
        }
    }

    #[test]
    fn ols_slope_of_line() {
        assert_relative_eq!(ols_slope(&[1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_relative_eq!(ols_slope(&[5.0, 3.0, 1.0]), -2.0);
        assert_relative_eq!(ols_slope(&[7.0]), 0.0);
        assert_relative_eq!(ols_slope(&[]), 0.0);
    }

    #[test]
    fn extrema_within_radius() {
        let bars = bars_from_close(&[5.0, 3.0, 4.0, 6.0, 2.0, 7.0]);
        let m = scan_extrema(&bars, 1);
        assert!(m[1].extremum_low);
        assert!(!m[2].extremum_low);
        assert!(m[3].extremum_high);
        assert!(m[4].extremum_low);
        assert!(m[5].extremum_high);
        assert!(m[0].extremum_high);
    }

    #[test]
    fn slope_start_after_decline() {
        let bars = bars_from_close(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 8.0]);
        let m = scan_slope(&bars, 4, 0.5);
        assert!(!m[0].slope_trend_start && !m[1].slope_trend_start);
        let starts: Vec<usize> = (0..m.len()).filter(|&i| m[i].slope_trend_start).collect();
        assert_eq!(starts, vec![6]);
        assert!(m.iter().all(|t| !t.slope_trend_end));
    }

    #[test]
    fn slope_end_after_rise() {
        let bars = bars_from_close(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 3.0]);
        let m = scan_slope(&bars, 4, 0.5);
        let ends: Vec<usize> = (0..m.len()).filter(|&i| m[i].slope_trend_end).collect();
        assert_eq!(ends, vec![6]);
        assert!(m.iter().all(|t| !t.slope_trend_start));
    }

    #[test]
    fn slope_start_pairs_with_extremum_high() {
        let mut close = vec![20.0, 19.0, 18.0, 17.0, 16.0];
        close.extend([15.0; 5]);
        close.extend([18.0, 21.0, 24.0, 27.0]);
        close.extend([30.0; 6]);
        let bars = bars_from_close(&close);
        let config = GoalConfig {
            window_radius: 4,
            profit_filter: 10.0,
            ..loose_config()
        };

        let m = mark_trends(&bars, 4, 0.5);
        assert!(m[10].slope_trend_start && !m[10].extremum_low);

        let goals = calculate_goals(&bars, &config);
        assert_eq!(goals.len(), 1);
        let goal = &goals[0];
        assert!(goal.used_slope_analysis);
        assert_eq!(goal.start_time, bars[10].timestamp);
        assert_eq!(goal.end_time, bars[14].timestamp);
        assert_relative_eq!(goal.profit_percent, (30.0 - 18.0) / 18.0 * 100.0);
        assert_relative_eq!(goal.duration_days, 4.0);
        assert_eq!(goal.trend_category, TrendCategory::NewHigh);
    }

    #[test]
    fn goal_type_display_pads_on_request() {
        assert_eq!(GoalType::Buy.to_string(), "buy");
        assert_eq!(format!("{:<4}|", GoalType::Buy), "buy |");
        assert_eq!(format!("{:<4}|", GoalType::Sell), "sell|");
    }

    #[test]
    fn v_shape_yields_single_goal() {
        let close = v_shape();
        let bars = bars_from_close(&close);
        let goals = calculate_goals(&bars, &loose_config());

        assert_eq!(goals.len(), 1);
        let goal = &goals[0];
        assert_eq!(goal.index, 0);
        assert_eq!(goal.start_time, bars[10].timestamp);
        assert_eq!(goal.end_time, bars[20].timestamp);
        assert_relative_eq!(goal.start_price, 10.0);
        assert_relative_eq!(goal.end_price, 30.0);
        assert_relative_eq!(goal.profit_percent, (30.0 - 10.0) / 10.0 * 100.0);
        assert_relative_eq!(goal.duration_days, 10.0);
        assert_relative_eq!(goal.daily_profit_percent, 20.0);
        assert_eq!(goal.goal_type, GoalType::Buy);
        assert_eq!(goal.trend_category, TrendCategory::NewHigh);
    }

    #[test]
    fn filters_discard_candidates() {
        let bars = bars_from_close(&v_shape());
        let strict_profit = GoalConfig {
            profit_filter: 500.0,
            ..loose_config()
        };
        assert!(calculate_goals(&bars, &strict_profit).is_empty());

        let strict_duration = GoalConfig {
            duration_filter: 11.0,
            ..loose_config()
        };
        assert!(calculate_goals(&bars, &strict_duration).is_empty());

        // average liquidity over the swing is 200k
        let strict_liquidity = GoalConfig {
            liquidity_filter: 250_000.0,
            ..loose_config()
        };
        assert!(calculate_goals(&bars, &strict_liquidity).is_empty());
    }

    #[test]
    fn zero_volume_span_is_skipped() {
        let mut bars = bars_from_close(&v_shape());
        for bar in &mut bars {
            bar.volume = 0.0;
        }
        assert!(calculate_goals(&bars, &loose_config()).is_empty());
    }

    #[test]
    fn liquidity_stats_median_takes_upper_middle() {
        let stats = LiquidityStats::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_relative_eq!(stats.avg, 2.5);
        assert_relative_eq!(stats.min, 1.0);
        assert_relative_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.median, 3.0);
        assert!(LiquidityStats::from_values(&[0.0, 0.0]).is_none());
        assert!(LiquidityStats::from_values(&[]).is_none());
    }

    #[test]
    fn category_without_history_is_normal() {
        let bars = bars_from_close(&[10.0, 20.0]);
        assert_eq!(categorize(&bars, 0, 10.0, 20.0), TrendCategory::Normal);
    }

    #[test]
    fn category_rebound_near_history_low() {
        let bars = bars_from_close(&[10.0, 12.0, 14.0, 10.5]);
        assert_eq!(categorize(&bars, 3, 10.5, 14.2), TrendCategory::Rebound);
        assert_eq!(categorize(&bars, 3, 10.5, 15.0), TrendCategory::NewHigh);
        assert_eq!(categorize(&bars, 3, 12.0, 14.2), TrendCategory::Normal);
    }

    #[test]
    fn empty_series_yields_nothing() {
        assert!(calculate_goals(&[], &GoalConfig::default()).is_empty());
        assert!(mark_trends(&[], 40, 0.5).is_empty());
    }
}
