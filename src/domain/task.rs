//! Backtest task model.
//!
//! Lifecycle: `Pending` on submission, `Processing` once dequeued, then exactly
//! one of `Completed` (with a result) or `Failed` (with an error message).

use crate::domain::indicator::IndicatorConfig;
use crate::domain::metrics::{AggregateSummary, BacktestSummary};
use crate::domain::price_bar::Granularity;
use crate::domain::signal::SignalEvent;
use crate::domain::strategy::Strategy;
use crate::domain::transaction::Transaction;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskParams {
    pub codes: Vec<String>,
    pub granularity: Granularity,
    pub indicators: IndicatorConfig,
    pub strategy: Strategy,
}

/// One instrument's run inside a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentBacktest {
    pub code: String,
    pub bars: usize,
    pub signals: Vec<SignalEvent>,
    pub transactions: Vec<Transaction>,
    pub summary: BacktestSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskResult {
    pub instruments: Vec<InstrumentBacktest>,
    pub skipped: Vec<String>,
    pub aggregate: AggregateSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub params: TaskParams,
    pub progress_percent: u8,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
}

/// A submission; the queue assigns an id when none is given.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub id: Option<TaskId>,
    pub name: String,
    pub params: TaskParams,
}

impl TaskRequest {
    pub fn new(name: impl Into<String>, params: TaskParams) -> Self {
        Self {
            id: None,
            name: name.into(),
            params,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub(crate) fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            name: self.name,
            status: TaskStatus::Pending,
            params: self.params,
            progress_percent: 0,
            result: None,
            error: None,
        }
    }
}

/// `floor(100 * done / total)`, 100 for an empty universe.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}
