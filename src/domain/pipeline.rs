//! Per-instrument backtest: bars, indicator frame, ladder scan, summary.

use crate::domain::error::LadderError;
use crate::domain::goal::{calculate_goals, Goal, GoalConfig};
use crate::domain::indicator::compute_indicator_frame;
use crate::domain::job_queue::InstrumentPipeline;
use crate::domain::price_bar::{Granularity, PriceBar};
use crate::domain::signal::run_signal_pipeline;
use crate::domain::task::{InstrumentBacktest, TaskParams};
use crate::ports::data_port::DataPort;
use std::sync::Arc;

pub struct BacktestPipeline {
    data: Arc<dyn DataPort>,
}

impl BacktestPipeline {
    pub fn new(data: Arc<dyn DataPort>) -> Self {
        Self { data }
    }
}

/// Bars for `code`, or `None` when the source has nothing for it.
pub fn fetch_available(
    data: &dyn DataPort,
    code: &str,
    granularity: Granularity,
) -> Result<Option<Vec<PriceBar>>, LadderError> {
    match data.fetch_bars(code, granularity) {
        Ok(bars) if bars.is_empty() => Ok(None),
        Ok(bars) => Ok(Some(bars)),
        Err(LadderError::NoData { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl InstrumentPipeline for BacktestPipeline {
    fn run_instrument(
        &self,
        code: &str,
        params: &TaskParams,
    ) -> Result<Option<InstrumentBacktest>, LadderError> {
        let Some(bars) = fetch_available(self.data.as_ref(), code, params.granularity)? else {
            return Ok(None);
        };

        let frame = compute_indicator_frame(&bars, &params.indicators);
        let output = run_signal_pipeline(&frame, &params.strategy.buy, &params.strategy.sell);
        log::debug!(
            "{}: {} bars, {} signals, {} trades",
            code,
            bars.len(),
            output.signals.len(),
            output.transactions.len()
        );

        Ok(Some(InstrumentBacktest {
            code: code.to_string(),
            bars: bars.len(),
            signals: output.signals,
            transactions: output.transactions,
            summary: output.summary,
        }))
    }
}

/// Goal scan over the day series of one instrument.
pub fn goals_for(
    data: &dyn DataPort,
    code: &str,
    config: &GoalConfig,
) -> Result<Option<Vec<Goal>>, LadderError> {
    Ok(fetch_available(data, code, Granularity::Day)?.map(|bars| calculate_goals(&bars, config)))
}
