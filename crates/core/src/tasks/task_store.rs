use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::tasks::task_model::{TaskState, TaskStatus};

/// In-memory registry of background task runs, keyed by task id.
///
/// Statuses live for the process lifetime; callers poll by id.
#[derive(Debug, Default)]
pub struct TaskStatusStore {
    statuses: DashMap<String, TaskStatus>,
}

impl TaskStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending task and returns its id.
    pub fn create(&self, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.statuses.insert(
            id.clone(),
            TaskStatus {
                id: id.clone(),
                name: name.to_string(),
                state: TaskState::Pending,
                created_at: Utc::now(),
                started_at: None,
                finished_at: None,
                detail: None,
            },
        );
        id
    }

    pub fn mark_running(&self, id: &str) {
        if let Some(mut status) = self.statuses.get_mut(id) {
            status.state = TaskState::Running;
            status.started_at = Some(Utc::now());
        }
    }

    pub fn mark_completed(&self, id: &str, detail: String) {
        self.finish(id, TaskState::Completed, Some(detail));
    }

    pub fn mark_failed(&self, id: &str, error: String) {
        self.finish(id, TaskState::Failed, Some(error));
    }

    pub fn mark_cancelled(&self, id: &str) {
        self.finish(id, TaskState::Cancelled, None);
    }

    fn finish(&self, id: &str, state: TaskState, detail: Option<String>) {
        if let Some(mut status) = self.statuses.get_mut(id) {
            status.state = state;
            status.finished_at = Some(Utc::now());
            status.detail = detail;
        }
    }

    pub fn get(&self, id: &str) -> Option<TaskStatus> {
        self.statuses.get(id).map(|s| s.clone())
    }

    /// All known statuses, newest first.
    pub fn list(&self) -> Vec<TaskStatus> {
        let mut statuses: Vec<TaskStatus> = self.statuses.iter().map(|s| s.clone()).collect();
        statuses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        statuses
    }
}
