//! Serialised backtest task queue.
//!
//! FIFO with a single consumer. The first submission spawns a worker thread
//! that drains the queue and exits when it is empty; the next submission
//! spawns a fresh one. Only the worker moves a task to `Processing`, so at most
//! one task is ever running and tasks finish in submission order.
//!
//! A task's pipeline error or panic is recorded as `Failed` on that task and
//! never reaches the caller or the tasks queued behind it. There is no
//! cancellation and no timeout: a started task runs to completion or failure.
//!
//! Listeners registered with [`JobQueue::add_listener`] receive a fresh
//! [`QueueStatus`] after every enqueue, start, completion, failure and clear.
//! A panicking listener is logged and skipped.

use crate::domain::error::LadderError;
use crate::domain::metrics::{aggregate_summaries, BacktestSummary};
use crate::domain::task::{
    progress_percent, InstrumentBacktest, Task, TaskId, TaskParams, TaskRequest, TaskResult,
    TaskStatus,
};
use crate::ports::task_store::TaskStore;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Progress is persisted at least this often, in instruments.
pub const PROGRESS_INTERVAL: usize = 5;

/// Runs the backtest for one instrument of a task.
pub trait InstrumentPipeline: Send + Sync {
    /// `Ok(None)` means the instrument had no data and is skipped.
    fn run_instrument(
        &self,
        code: &str,
        params: &TaskParams,
    ) -> Result<Option<InstrumentBacktest>, LadderError>;
}

/// Callback invoked with the queue status on every transition.
pub type QueueListener = Arc<dyn Fn(&QueueStatus) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Tasks waiting to start. The running task is not counted.
    pub queue_length: usize,
    pub is_processing: bool,
    /// Id of the running task; fetch the task itself with [`JobQueue::task`].
    pub current_task: Option<TaskId>,
    pub pending_tasks: Vec<TaskId>,
    pub completed_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Task>,
    current: Option<TaskId>,
    worker_running: bool,
    next_id: u64,
    completed: usize,
    failed: usize,
}

struct Shared {
    state: Mutex<QueueState>,
    idle: Condvar,
    listeners: Mutex<Vec<(String, QueueListener)>>,
    store: Arc<dyn TaskStore>,
    pipeline: Arc<dyn InstrumentPipeline>,
}

#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<Shared>,
}

impl JobQueue {
    pub fn new(store: Arc<dyn TaskStore>, pipeline: Arc<dyn InstrumentPipeline>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    next_id: 1,
                    ..QueueState::default()
                }),
                idle: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
                store,
                pipeline,
            }),
        }
    }

    /// Enqueue a task as `Pending` and make sure a worker is draining the queue.
    pub fn add_task(&self, request: TaskRequest) -> Result<TaskId, LadderError> {
        let id = self.enqueue(request)?;
        self.shared.notify();
        Ok(id)
    }

    fn enqueue(&self, request: TaskRequest) -> Result<TaskId, LadderError> {
        let mut state = self.shared.lock();

        let id = match request.id {
            Some(id) => {
                state.next_id = state.next_id.max(id.0 + 1);
                id
            }
            None => {
                let id = TaskId(state.next_id);
                state.next_id += 1;
                id
            }
        };

        let task = request.into_task(id);
        self.shared.store.save(&task)?;
        log::info!(
            "queued {} '{}' ({} instruments), queue length {}",
            id,
            task.name,
            task.params.codes.len(),
            state.pending.len() + 1
        );
        state.pending.push_back(task);

        if !state.worker_running {
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name("ladderquant-queue".into())
                .spawn(move || worker_loop(shared))?;
            state.worker_running = true;
        }

        Ok(id)
    }

    pub fn status(&self) -> QueueStatus {
        self.shared.status()
    }

    /// Register `listener` under `id`, replacing any listener already there.
    pub fn add_listener<F>(&self, id: impl Into<String>, listener: F)
    where
        F: Fn(&QueueStatus) + Send + Sync + 'static,
    {
        let id = id.into();
        let mut listeners = self.shared.listeners();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.push((id, Arc::new(listener)));
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_listener(&self, id: &str) -> bool {
        let mut listeners = self.shared.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| existing != id);
        listeners.len() != before
    }

    /// Block until every queued task has finished.
    pub fn wait_idle(&self) {
        let mut state = self.shared.lock();
        while state.worker_running {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn task(&self, id: TaskId) -> Result<Option<Task>, LadderError> {
        self.shared.store.get(id)
    }

    /// Result of a completed task; `None` while unfinished or after failure.
    pub fn task_result(&self, id: TaskId) -> Result<Option<TaskResult>, LadderError> {
        Ok(self
            .shared
            .store
            .get(id)?
            .filter(|t| t.status == TaskStatus::Completed)
            .and_then(|t| t.result))
    }

    /// Drop tasks that have not started. They are recorded as failed.
    pub fn clear_pending(&self) -> Result<usize, LadderError> {
        let dropped: Vec<Task> = self.shared.lock().pending.drain(..).collect();
        for task in &dropped {
            self.shared.store.update_status(
                task.id,
                TaskStatus::Failed,
                None,
                Some("removed from queue before start".into()),
            )?;
        }
        if !dropped.is_empty() {
            log::info!("cleared {} pending tasks", dropped.len());
            self.shared.notify();
        }
        Ok(dropped.len())
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(String, QueueListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> QueueStatus {
        let state = self.lock();
        QueueStatus {
            queue_length: state.pending.len(),
            is_processing: state.current.is_some(),
            current_task: state.current,
            pending_tasks: state.pending.iter().map(|t| t.id).collect(),
            completed_count: state.completed,
            failed_count: state.failed,
        }
    }

    /// Call every listener with the current status. Must not be called with
    /// the state lock held.
    fn notify(&self) {
        let listeners = self.listeners().clone();
        if listeners.is_empty() {
            return;
        }
        let status = self.status();
        for (id, listener) in &listeners {
            let call = AssertUnwindSafe(|| (**listener)(&status));
            if let Err(payload) = panic::catch_unwind(call) {
                log::error!(
                    "queue listener '{}' panicked: {}",
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn process(&self, task: &Task) -> TaskStatus {
        log::info!("started {} '{}'", task.id, task.name);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_task(task)));
        let error = match outcome {
            Ok(Ok(result)) => {
                let instruments = result.instruments.len();
                match self
                    .store
                    .update_status(task.id, TaskStatus::Completed, Some(result), None)
                {
                    Ok(()) => {
                        log::info!("completed {} ({} instruments)", task.id, instruments);
                        return TaskStatus::Completed;
                    }
                    Err(e) => e.to_string(),
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };

        log::error!("failed {}: {}", task.id, error);
        if let Err(e) = self
            .store
            .update_status(task.id, TaskStatus::Failed, None, Some(error))
        {
            log::error!("could not record failure of {}: {}", task.id, e);
        }
        TaskStatus::Failed
    }

    fn run_task(&self, task: &Task) -> Result<TaskResult, LadderError> {
        self.store
            .update_status(task.id, TaskStatus::Processing, None, None)?;

        let codes = &task.params.codes;
        let total = codes.len();
        let mut instruments = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (n, code) in codes.iter().enumerate() {
            match self.pipeline.run_instrument(code, &task.params)? {
                Some(backtest) => instruments.push(backtest),
                None => {
                    log::warn!("{}: no data for {}, skipped", task.id, code);
                    skipped.push(code.clone());
                }
            }

            let done = n + 1;
            if done % PROGRESS_INTERVAL == 0 && done < total {
                let percent = progress_percent(done, total);
                self.store.update_progress(task.id, percent)?;
                log::debug!("{}: {}/{} instruments ({}%)", task.id, done, total, percent);
            }
        }
        self.store.update_progress(task.id, 100)?;

        let summaries: Vec<BacktestSummary> =
            instruments.iter().map(|i| i.summary.clone()).collect();
        Ok(TaskResult {
            aggregate: aggregate_summaries(&summaries),
            instruments,
            skipped,
        })
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock();
            match state.pending.pop_front() {
                Some(task) => {
                    state.current = Some(task.id);
                    task
                }
                None => {
                    state.worker_running = false;
                    state.current = None;
                    shared.idle.notify_all();
                    return;
                }
            }
        };

        shared.notify();
        let status = shared.process(&task);

        {
            let mut state = shared.lock();
            state.current = None;
            match status {
                TaskStatus::Completed => state.completed += 1,
                _ => state.failed += 1,
            }
        }
        shared.notify();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
