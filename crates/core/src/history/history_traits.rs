use async_trait::async_trait;

use crate::errors::Result;
use crate::history::history_model::HistoricalSnapshot;
use crate::tasks::task_model::CancelFlag;
use crate::utils::time_utils::DateRange;

/// Storage interface for portfolio-level daily snapshots.
#[async_trait]
pub trait HistorySnapshotRepositoryTrait: Send + Sync {
    /// Inserts or replaces snapshots keyed on date.
    async fn upsert_snapshots(&self, snapshots: Vec<HistoricalSnapshot>) -> Result<()>;

    /// Snapshots within the range, date ascending.
    async fn get_snapshots_in_range(&self, range: DateRange) -> Result<Vec<HistoricalSnapshot>>;

    async fn get_latest_snapshot(&self) -> Result<Option<HistoricalSnapshot>>;
}

/// Portfolio history operations.
#[async_trait]
pub trait HistoryServiceTrait: Send + Sync {
    /// Rebuilds snapshots for every trading day in the range from stored
    /// security values, recomputing moving averages from scratch. Returns
    /// the number of snapshots written.
    async fn recompute_history(&self, range: DateRange, cancel: CancelFlag) -> Result<usize>;

    async fn get_portfolio_history(&self, range: DateRange) -> Result<Vec<HistoricalSnapshot>>;
}
