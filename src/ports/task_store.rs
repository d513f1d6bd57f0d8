//! Task persistence port.

use crate::domain::error::LadderError;
use crate::domain::task::{Task, TaskId, TaskResult, TaskStatus};

pub trait TaskStore: Send + Sync {
    fn save(&self, task: &Task) -> Result<(), LadderError>;

    fn update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        result: Option<TaskResult>,
        error: Option<String>,
    ) -> Result<(), LadderError>;

    fn update_progress(&self, id: TaskId, percent: u8) -> Result<(), LadderError>;

    fn get(&self, id: TaskId) -> Result<Option<Task>, LadderError>;
}
