//! Pairing of buy/sell signals into completed round trips.

use crate::domain::price_bar::MS_PER_DAY;
use crate::domain::signal::{SignalEvent, SignalType};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub buy_index: usize,
    pub buy_time: NaiveDateTime,
    pub buy_price: f64,
    pub sell_index: usize,
    pub sell_time: NaiveDateTime,
    pub sell_price: f64,
    pub profit_percent: f64,
    pub duration_days: i64,
}

impl Transaction {
    pub fn from_pair(buy: &SignalEvent, sell: &SignalEvent) -> Self {
        Self {
            buy_index: buy.index,
            buy_time: buy.timestamp,
            buy_price: buy.price,
            sell_index: sell.index,
            sell_time: sell.timestamp,
            sell_price: sell.price,
            profit_percent: profit_percent(buy.price, sell.price),
            duration_days: holding_days(buy.timestamp, sell.timestamp),
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.profit_percent > 0.0
    }
}

/// Completed round trips plus any buy still waiting for its sell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionLedger {
    pub completed: Vec<Transaction>,
    pub first_buy: Option<SignalEvent>,
    pub open: Option<SignalEvent>,
}

pub fn profit_percent(buy_price: f64, sell_price: f64) -> f64 {
    (sell_price - buy_price) / buy_price * 100.0
}

/// Whole days held, rounded up, never less than one.
pub fn holding_days(buy_time: NaiveDateTime, sell_time: NaiveDateTime) -> i64 {
    let ms = (sell_time - buy_time).num_milliseconds() as f64;
    ((ms / MS_PER_DAY).ceil() as i64).max(1)
}

pub fn build_transactions(signals: &[SignalEvent]) -> TransactionLedger {
    let mut ledger = TransactionLedger::default();
    let mut pending: Option<&SignalEvent> = None;

    for signal in signals {
        match signal.signal_type {
            SignalType::Buy => {
                if ledger.first_buy.is_none() {
                    ledger.first_buy = Some(signal.clone());
                }
                pending = Some(signal);
            }
            SignalType::Sell => {
                if let Some(buy) = pending.take() {
                    if signal.index > buy.index {
                        ledger.completed.push(Transaction::from_pair(buy, signal));
                    }
                }
            }
        }
    }

    ledger.open = pending.cloned();
    ledger
}
