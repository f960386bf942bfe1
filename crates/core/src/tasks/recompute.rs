use dashmap::DashMap;
use log::{error, info};
use std::sync::Arc;

use crate::allocation::allocation_traits::AllocationServiceTrait;
use crate::history::history_traits::HistoryServiceTrait;
use crate::tasks::task_model::{CancelFlag, TaskStatus};
use crate::tasks::task_store::TaskStatusStore;
use crate::utils::time_utils::DateRange;
use crate::valuation::valuation_traits::ValuationServiceTrait;

const TASK_NAME: &str = "recompute";

/// Full derived-state rebuild: valuation rows, then portfolio history,
/// then allocation drift.
///
/// Each run gets a task id and a cancel flag; callers poll the status
/// store by id and may cancel between stages. Stages run in order because
/// each reads what the previous one wrote.
pub struct RecomputeTask {
    valuation: Arc<dyn ValuationServiceTrait>,
    history: Arc<dyn HistoryServiceTrait>,
    allocation: Arc<dyn AllocationServiceTrait>,
    store: Arc<TaskStatusStore>,
    cancel_flags: DashMap<String, CancelFlag>,
}

impl RecomputeTask {
    pub fn new(
        valuation: Arc<dyn ValuationServiceTrait>,
        history: Arc<dyn HistoryServiceTrait>,
        allocation: Arc<dyn AllocationServiceTrait>,
        store: Arc<TaskStatusStore>,
    ) -> Self {
        RecomputeTask {
            valuation,
            history,
            allocation,
            store,
            cancel_flags: DashMap::new(),
        }
    }

    /// Registers a run and executes it in the background. Returns the task
    /// id immediately.
    pub fn start(self: &Arc<Self>, symbols: Option<Vec<String>>, range: DateRange) -> String {
        let id = self.store.create(TASK_NAME);
        let task = Arc::clone(self);
        let task_id = id.clone();
        tokio::spawn(async move {
            task.run(&task_id, symbols, range).await;
        });
        id
    }

    /// Executes the pipeline for an already-registered task id.
    pub async fn run(&self, task_id: &str, symbols: Option<Vec<String>>, range: DateRange) {
        let cancel = CancelFlag::new();
        self.cancel_flags
            .insert(task_id.to_string(), cancel.clone());
        self.store.mark_running(task_id);

        let outcome = self.execute(symbols, range, &cancel).await;
        match outcome {
            Ok(_) if cancel.is_cancelled() => {
                info!("Recompute task {task_id} cancelled");
                self.store.mark_cancelled(task_id);
            }
            Ok(detail) => {
                self.store.mark_completed(task_id, detail);
            }
            Err(err) => {
                error!("Recompute task {task_id} failed: {err}");
                self.store.mark_failed(task_id, err.to_string());
            }
        }
        self.cancel_flags.remove(task_id);
    }

    async fn execute(
        &self,
        symbols: Option<Vec<String>>,
        range: DateRange,
        cancel: &CancelFlag,
    ) -> crate::errors::Result<String> {
        let report = self
            .valuation
            .recompute_valuation(symbols, range, cancel.clone())
            .await?;
        if cancel.is_cancelled() {
            return Ok(String::new());
        }

        let snapshots = self.history.recompute_history(range, cancel.clone()).await?;
        if cancel.is_cancelled() {
            return Ok(String::new());
        }

        let states = self.allocation.refresh_drift().await?;

        Ok(format!(
            "{} value rows, {} snapshots, {} drift states, {} gaps",
            report.rows_written,
            snapshots,
            states.len(),
            report.gaps.len()
        ))
    }

    /// Requests cancellation of a running task. Finished tasks are
    /// unaffected.
    pub fn cancel(&self, task_id: &str) {
        if let Some(flag) = self.cancel_flags.get(task_id) {
            flag.cancel();
        }
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.store.get(task_id)
    }

    pub fn list_statuses(&self) -> Vec<TaskStatus> {
        self.store.list()
    }
}
