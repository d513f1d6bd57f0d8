//! Ladder signal scanner.
//!
//! A single forward pass over the frame. While awaiting a buy, each bar that
//! satisfies every entry of the current buy stage advances the ladder; when the
//! last stage is satisfied a buy fires and the scanner switches to the sell
//! ladder. Sells work the same way in reverse. Stages are re-evaluated from the
//! next bar onwards, so one bar never satisfies two stages.

use crate::domain::condition::ConditionGroup;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::metrics::{compute_summary, BacktestSummary};
use crate::domain::transaction::{build_transactions, Transaction};
use chrono::NaiveDateTime;
use serde::Serialize;

pub const REVERSAL_RUN_THRESHOLD: i64 = -50;
pub const REVERSAL_DISPERSION_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEvent {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub price: f64,
}

impl SignalEvent {
    fn at(frame: &IndicatorFrame, index: usize, signal_type: SignalType) -> Self {
        Self {
            index,
            timestamp: frame.timestamps[index],
            signal_type,
            price: frame.close[index],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AwaitingBuy,
    Holding,
}

#[derive(Debug)]
pub struct SignalStateMachine<'a> {
    buy: &'a [ConditionGroup],
    sell: &'a [ConditionGroup],
    mode: Mode,
    buy_stage: usize,
    sell_stage: usize,
}

impl<'a> SignalStateMachine<'a> {
    pub fn new(buy: &'a [ConditionGroup], sell: &'a [ConditionGroup]) -> Self {
        Self {
            buy,
            sell,
            mode: Mode::AwaitingBuy,
            buy_stage: 0,
            sell_stage: 0,
        }
    }

    fn degenerate(&self) -> bool {
        self.buy.is_empty()
            || self.sell.is_empty()
            || self.buy.iter().any(Vec::is_empty)
            || self.sell.iter().any(Vec::is_empty)
    }

    /// Feed bar `i`; returns the signal fired on this bar, if any.
    pub fn step(&mut self, frame: &IndicatorFrame, i: usize) -> Option<SignalType> {
        let (groups, stage, fired) = match self.mode {
            Mode::AwaitingBuy => (self.buy, &mut self.buy_stage, SignalType::Buy),
            Mode::Holding => (self.sell, &mut self.sell_stage, SignalType::Sell),
        };

        let Some(group) = groups.get(*stage) else {
            return None;
        };
        if group.is_empty() || !group.iter().all(|tree| tree.evaluate(frame, i)) {
            return None;
        }

        *stage += 1;
        if *stage < groups.len() {
            return None;
        }

        *stage = 0;
        self.mode = match self.mode {
            Mode::AwaitingBuy => Mode::Holding,
            Mode::Holding => Mode::AwaitingBuy,
        };
        Some(fired)
    }

    pub fn scan(mut self, frame: &IndicatorFrame) -> Vec<SignalEvent> {
        if self.degenerate() {
            return Vec::new();
        }

        let mut signals = Vec::new();
        for i in 0..frame.len() {
            if let Some(signal_type) = self.step(frame, i) {
                signals.push(SignalEvent::at(frame, i, signal_type));
            }
        }
        signals
    }
}

pub fn generate_signals(
    frame: &IndicatorFrame,
    buy: &[ConditionGroup],
    sell: &[ConditionGroup],
) -> Vec<SignalEvent> {
    SignalStateMachine::new(buy, sell).scan(frame)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalPipelineOutput {
    pub signals: Vec<SignalEvent>,
    pub transactions: Vec<Transaction>,
    pub summary: BacktestSummary,
}

pub fn run_signal_pipeline(
    frame: &IndicatorFrame,
    buy: &[ConditionGroup],
    sell: &[ConditionGroup],
) -> SignalPipelineOutput {
    let signals = generate_signals(frame, buy, sell);
    let ledger = build_transactions(&signals);
    let summary = compute_summary(frame, &ledger);
    SignalPipelineOutput {
        signals,
        transactions: ledger.completed,
        summary,
    }
}

/// Buy-type events where a long bearish regime flips while the averages are still tight.
pub fn reversal_signals(
    frame: &IndicatorFrame,
    run_threshold: i64,
    dispersion_threshold: f64,
) -> Vec<SignalEvent> {
    (1..frame.len())
        .filter(|&i| {
            frame.sign1[i] >= 0
                && frame.sign1[i - 1] < run_threshold
                && frame.sign2[i - 1] < dispersion_threshold
        })
        .map(|i| SignalEvent::at(frame, i, SignalType::Buy))
        .collect()
}
