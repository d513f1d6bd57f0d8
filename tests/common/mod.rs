#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ladderquant::adapters::memory_task_store::MemoryTaskStore;
use ladderquant::domain::error::LadderError;
use ladderquant::domain::indicator::IndicatorConfig;
use ladderquant::domain::job_queue::InstrumentPipeline;
use ladderquant::domain::metrics::BacktestSummary;
use ladderquant::domain::price_bar::{Granularity, PriceBar};
use ladderquant::domain::strategy::Strategy;
use ladderquant::domain::task::{
    InstrumentBacktest, Task, TaskId, TaskParams, TaskResult, TaskStatus,
};
use ladderquant::ports::data_port::DataPort;
use ladderquant::ports::task_store::TaskStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, code: &str, _granularity: Granularity) -> Result<Vec<PriceBar>, LadderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(LadderError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data.get(code).cloned().ok_or_else(|| LadderError::NoData {
            code: code.to_string(),
        })
    }

    fn list_symbols(&self, _granularity: Granularity) -> Result<Vec<String>, LadderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn day(n: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(n as i64)
}

pub fn make_bar(n: u32, close: f64) -> PriceBar {
    PriceBar {
        timestamp: day(n),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000.0,
    }
}

/// One daily bar per close, starting 2024-01-01.
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i as u32, c))
        .collect()
}

/// Falls for `down` bars, then rises for `up` bars.
pub fn v_shape(down: usize, up: usize) -> Vec<f64> {
    let mut closes = Vec::with_capacity(down + up);
    let mut price = 100.0;
    for _ in 0..down {
        closes.push(price);
        price *= 0.98;
    }
    for _ in 0..up {
        closes.push(price);
        price *= 1.03;
    }
    closes
}

pub fn make_params(codes: &[&str]) -> TaskParams {
    TaskParams {
        codes: codes.iter().map(|c| c.to_string()).collect(),
        granularity: Granularity::Day,
        indicators: IndicatorConfig::default(),
        strategy: Strategy::parse("test", "MAS_GT_MAM", "MAS_LT_MAM").unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Status(TaskId, TaskStatus),
    Progress(TaskId, u8),
}

/// Memory store that also keeps every status and progress write in order.
#[derive(Default)]
pub struct RecordingTaskStore {
    inner: MemoryTaskStore,
    pub events: Mutex<Vec<StoreEvent>>,
}

impl RecordingTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_of(&self, id: TaskId) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StoreEvent::Progress(t, p) if t == id => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn statuses_of(&self, id: TaskId) -> Vec<TaskStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StoreEvent::Status(t, s) if t == id => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl TaskStore for RecordingTaskStore {
    fn save(&self, task: &Task) -> Result<(), LadderError> {
        self.inner.save(task)
    }

    fn update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: Option<TaskResult>,
        error: Option<String>,
    ) -> Result<(), LadderError> {
        self.events.lock().unwrap().push(StoreEvent::Status(id, status));
        self.inner.update_status(id, status, result, error)
    }

    fn update_progress(&self, id: TaskId, percent: u8) -> Result<(), LadderError> {
        self.events.lock().unwrap().push(StoreEvent::Progress(id, percent));
        self.inner.update_progress(id, percent)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, LadderError> {
        self.inner.get(id)
    }
}

/// Pipeline with scripted outcomes per code. Logs the order codes are run in
/// and the peak number of concurrent runs.
pub struct ScriptedPipeline {
    pub log: Mutex<Vec<String>>,
    pub failing: HashSet<String>,
    pub panicking: HashSet<String>,
    pub missing: HashSet<String>,
    pub delay: Duration,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    gate: Mutex<bool>,
    gate_cv: Condvar,
}

impl ScriptedPipeline {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            missing: HashSet::new(),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            gate: Mutex::new(true),
            gate_cv: Condvar::new(),
        }
    }

    pub fn failing_on(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    pub fn panicking_on(mut self, code: &str) -> Self {
        self.panicking.insert(code.to_string());
        self
    }

    pub fn missing(mut self, code: &str) -> Self {
        self.missing.insert(code.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Runs block until `open_gate` is called.
    pub fn closed(self) -> Self {
        *self.gate.lock().unwrap() = false;
        self
    }

    pub fn open_gate(&self) {
        *self.gate.lock().unwrap() = true;
        self.gate_cv.notify_all();
    }

    pub fn run_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl InstrumentPipeline for ScriptedPipeline {
    fn run_instrument(
        &self,
        code: &str,
        _params: &TaskParams,
    ) -> Result<Option<InstrumentBacktest>, LadderError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        {
            let mut open = self.gate.lock().unwrap();
            while !*open {
                open = self.gate_cv.wait(open).unwrap();
            }
        }
        thread::sleep(self.delay);
        self.log.lock().unwrap().push(code.to_string());
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(code) {
            panic!("pipeline blew up on {code}");
        }
        if self.failing.contains(code) {
            return Err(LadderError::DataSource {
                reason: format!("feed down for {code}"),
            });
        }
        if self.missing.contains(code) {
            return Ok(None);
        }

        Ok(Some(InstrumentBacktest {
            code: code.to_string(),
            bars: 10,
            signals: Vec::new(),
            transactions: Vec::new(),
            summary: BacktestSummary::default(),
        }))
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub fn eventually<F: FnMut() -> bool>(mut cond: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
