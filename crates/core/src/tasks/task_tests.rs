use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::allocation::allocation_model::{
    AllocationState, AllocationTarget, CandidateScore, TrimCandidate,
};
use crate::allocation::allocation_traits::AllocationServiceTrait;
use crate::errors::{Error, RecomputeError, Result};
use crate::history::history_model::HistoricalSnapshot;
use crate::history::history_traits::HistoryServiceTrait;
use crate::tasks::recompute::RecomputeTask;
use crate::tasks::task_model::{CancelFlag, TaskState};
use crate::tasks::task_store::TaskStatusStore;
use crate::utils::time_utils::DateRange;
use crate::valuation::valuation_model::{RecomputeReport, SecurityValue};
use crate::valuation::valuation_traits::ValuationServiceTrait;

#[derive(Default)]
struct MockValuation {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ValuationServiceTrait for MockValuation {
    async fn recompute_valuation(
        &self,
        _symbols: Option<Vec<String>>,
        _range: DateRange,
        _cancel: CancelFlag,
    ) -> Result<RecomputeReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Unexpected("valuation exploded".to_string()));
        }
        Ok(RecomputeReport {
            rows_written: 7,
            symbols_processed: 1,
            ..Default::default()
        })
    }

    async fn get_security_value(&self, symbol: &str, date: NaiveDate) -> Result<SecurityValue> {
        Err(RecomputeError::MissingPriceData {
            symbol: symbol.to_string(),
            date,
        }
        .into())
    }

    async fn get_security_values(
        &self,
        _symbol: &str,
        _range: DateRange,
    ) -> Result<Vec<SecurityValue>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockHistory {
    calls: AtomicUsize,
}

#[async_trait]
impl HistoryServiceTrait for MockHistory {
    async fn recompute_history(&self, _range: DateRange, _cancel: CancelFlag) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(3)
    }

    async fn get_portfolio_history(&self, _range: DateRange) -> Result<Vec<HistoricalSnapshot>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockAllocation {
    calls: AtomicUsize,
}

#[async_trait]
impl AllocationServiceTrait for MockAllocation {
    async fn set_target(&self, _target: AllocationTarget) -> Result<()> {
        Ok(())
    }

    async fn refresh_drift(&self) -> Result<Vec<AllocationState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn get_allocation_drift(&self) -> Result<Vec<AllocationState>> {
        Ok(Vec::new())
    }

    async fn buy_candidates(&self) -> Result<Vec<CandidateScore>> {
        Ok(Vec::new())
    }

    async fn trim_candidates(&self) -> Result<Vec<TrimCandidate>> {
        Ok(Vec::new())
    }
}

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

fn pipeline(fail_valuation: bool) -> (RecomputeTask, Arc<MockValuation>, Arc<MockHistory>, Arc<MockAllocation>, Arc<TaskStatusStore>) {
    let valuation = Arc::new(MockValuation {
        fail: fail_valuation,
        ..Default::default()
    });
    let history = Arc::new(MockHistory::default());
    let allocation = Arc::new(MockAllocation::default());
    let store = Arc::new(TaskStatusStore::new());
    let task = RecomputeTask::new(
        valuation.clone(),
        history.clone(),
        allocation.clone(),
        store.clone(),
    );
    (task, valuation, history, allocation, store)
}

#[tokio::test]
async fn pipeline_runs_all_stages_and_completes() {
    let (task, valuation, history, allocation, store) = pipeline(false);
    let id = store.create("recompute");

    task.run(&id, None, range()).await;

    assert_eq!(valuation.calls.load(Ordering::SeqCst), 1);
    assert_eq!(history.calls.load(Ordering::SeqCst), 1);
    assert_eq!(allocation.calls.load(Ordering::SeqCst), 1);

    let status = store.get(&id).unwrap();
    assert_eq!(status.state, TaskState::Completed);
    assert!(status.started_at.is_some());
    assert!(status.finished_at.is_some());
    assert!(status.detail.unwrap().contains("7 value rows"));
}

#[tokio::test]
async fn valuation_failure_marks_failed_and_skips_later_stages() {
    let (task, _, history, allocation, store) = pipeline(true);
    let id = store.create("recompute");

    task.run(&id, None, range()).await;

    assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    assert_eq!(allocation.calls.load(Ordering::SeqCst), 0);

    let status = store.get(&id).unwrap();
    assert_eq!(status.state, TaskState::Failed);
    assert!(status.detail.unwrap().contains("valuation exploded"));
}

#[tokio::test]
async fn start_returns_a_pollable_task_id() {
    let (task, ..) = pipeline(false);
    let task = Arc::new(task);

    let id = task.start(None, range());
    assert!(task.status(&id).is_some());

    // Poll until the background run settles.
    for _ in 0..100 {
        if task.status(&id).unwrap().state == TaskState::Completed {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("task never completed");
}

#[test]
fn store_tracks_lifecycle_timestamps() {
    let store = TaskStatusStore::new();
    let id = store.create("recompute");

    let created = store.get(&id).unwrap();
    assert_eq!(created.state, TaskState::Pending);
    assert!(created.started_at.is_none());

    store.mark_running(&id);
    store.mark_completed(&id, "done".to_string());

    let finished = store.get(&id).unwrap();
    assert_eq!(finished.state, TaskState::Completed);
    assert!(finished.started_at.unwrap() <= finished.finished_at.unwrap());
    assert_eq!(finished.detail.as_deref(), Some("done"));
}

#[test]
fn cancel_flag_is_shared_between_clones() {
    let flag = CancelFlag::new();
    let clone = flag.clone();
    assert!(!clone.is_cancelled());
    flag.cancel();
    assert!(clone.is_cancelled());
}
