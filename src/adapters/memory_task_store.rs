//! In-process task store.

use crate::domain::error::LadderError;
use crate::domain::task::{Task, TaskId, TaskResult, TaskStatus};
use crate::ports::task_store::TaskStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_task<F>(&self, id: TaskId, f: F) -> Result<(), LadderError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.lock();
        let task = tasks.get_mut(&id).ok_or_else(|| LadderError::TaskStore {
            reason: format!("unknown task {}", id),
        })?;
        f(task);
        Ok(())
    }
}

impl TaskStore for MemoryTaskStore {
    fn save(&self, task: &Task) -> Result<(), LadderError> {
        self.lock().insert(task.id, task.clone());
        Ok(())
    }

    fn update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: Option<TaskResult>,
        error: Option<String>,
    ) -> Result<(), LadderError> {
        self.with_task(id, |task| {
            task.status = status;
            if result.is_some() {
                task.result = result;
            }
            if error.is_some() {
                task.error = error;
            }
        })
    }

    fn update_progress(&self, id: TaskId, percent: u8) -> Result<(), LadderError> {
        self.with_task(id, |task| task.progress_percent = percent.min(100))
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, LadderError> {
        Ok(self.lock().get(&id).cloned())
    }
}
