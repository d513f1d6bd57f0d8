//! Backtest summary statistics.
//!
//! Per-instrument summaries come from the completed transactions plus a
//! buy-and-hold baseline over the same span. Cross-instrument aggregation
//! averages every metric but recomputes the win rate from summed trade counts.

use crate::domain::indicator::IndicatorFrame;
use crate::domain::transaction::{holding_days, TransactionLedger};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub profit_trades: usize,
    pub loss_trades: usize,
    pub win_rate: f64,
    pub days_duration: f64,
    pub price_change: f64,
    pub daily_change: f64,
    pub max_drawdown: f64,
    pub day_line_price_change: f64,
    pub day_line_daily_change: f64,
    pub price_change_diff: f64,
    pub daily_change_diff: f64,
    pub avg_profit: f64,
    pub total_profit: f64,
    pub max_profit: f64,
    pub avg_holding_days: f64,
    pub open_position: bool,
}

pub fn compute_summary(frame: &IndicatorFrame, ledger: &TransactionLedger) -> BacktestSummary {
    let trades = &ledger.completed;
    let open_position = ledger.open.is_some();

    let (Some(first_buy), false) = (ledger.first_buy.as_ref(), trades.is_empty()) else {
        return BacktestSummary {
            open_position,
            ..BacktestSummary::default()
        };
    };

    let total_trades = trades.len();
    let profit_trades = trades.iter().filter(|t| t.is_profitable()).count();
    let n = total_trades as f64;

    let profits: Vec<f64> = trades.iter().map(|t| t.profit_percent).collect();
    let total_profit: f64 = profits.iter().sum();
    let max_profit = profits.iter().copied().fold(f64::MIN, f64::max);
    let max_drawdown = profits.iter().copied().fold(f64::MAX, f64::min);
    let avg_holding_days = trades.iter().map(|t| t.duration_days as f64).sum::<f64>() / n;

    let compounded = profits.iter().fold(1.0, |acc, p| acc * (1.0 + p / 100.0));
    let price_change = (compounded - 1.0) * 100.0;

    let last = frame.len().saturating_sub(1);
    let days_duration = frame
        .timestamps
        .get(last)
        .map(|&end| holding_days(first_buy.timestamp, end) as f64)
        .unwrap_or(1.0);
    let daily_change = price_change / days_duration;

    let day_line_price_change = match (frame.close.get(first_buy.index), frame.close.get(last)) {
        (Some(&start), Some(&end)) if start != 0.0 => (end - start) / start * 100.0,
        _ => 0.0,
    };
    let day_line_daily_change = day_line_price_change / days_duration;

    BacktestSummary {
        total_trades,
        profit_trades,
        loss_trades: total_trades - profit_trades,
        win_rate: profit_trades as f64 / n,
        days_duration,
        price_change,
        daily_change,
        max_drawdown,
        day_line_price_change,
        day_line_daily_change,
        price_change_diff: price_change - day_line_price_change,
        daily_change_diff: daily_change - day_line_daily_change,
        avg_profit: total_profit / n,
        total_profit,
        max_profit,
        avg_holding_days,
        open_position,
    }
}

/// Cross-instrument roll-up. Trade counts are summed, metrics are averaged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub instrument_count: usize,
    pub total_trades: usize,
    pub profit_trades: usize,
    pub loss_trades: usize,
    pub win_rate: f64,
    pub days_duration: f64,
    pub price_change: f64,
    pub daily_change: f64,
    pub max_drawdown: f64,
    pub day_line_price_change: f64,
    pub day_line_daily_change: f64,
    pub price_change_diff: f64,
    pub daily_change_diff: f64,
    pub avg_profit: f64,
    pub total_profit: f64,
    pub max_profit: f64,
    pub avg_holding_days: f64,
    pub open_positions: usize,
}

pub fn aggregate_summaries(summaries: &[BacktestSummary]) -> AggregateSummary {
    if summaries.is_empty() {
        return AggregateSummary::default();
    }

    let n = summaries.len() as f64;
    let mean = |field: fn(&BacktestSummary) -> f64| summaries.iter().map(field).sum::<f64>() / n;

    let total_trades: usize = summaries.iter().map(|s| s.total_trades).sum();
    let profit_trades: usize = summaries.iter().map(|s| s.profit_trades).sum();
    let win_rate = if total_trades > 0 {
        profit_trades as f64 / total_trades as f64
    } else {
        0.0
    };

    AggregateSummary {
        instrument_count: summaries.len(),
        total_trades,
        profit_trades,
        loss_trades: summaries.iter().map(|s| s.loss_trades).sum(),
        win_rate,
        days_duration: mean(|s| s.days_duration),
        price_change: mean(|s| s.price_change),
        daily_change: mean(|s| s.daily_change),
        max_drawdown: mean(|s| s.max_drawdown),
        day_line_price_change: mean(|s| s.day_line_price_change),
        day_line_daily_change: mean(|s| s.day_line_daily_change),
        price_change_diff: mean(|s| s.price_change_diff),
        daily_change_diff: mean(|s| s.daily_change_diff),
        avg_profit: mean(|s| s.avg_profit),
        total_profit: mean(|s| s.total_profit),
        max_profit: mean(|s| s.max_profit),
        avg_holding_days: mean(|s| s.avg_holding_days),
        open_positions: summaries.iter().filter(|s| s.open_position).count(),
    }
}
