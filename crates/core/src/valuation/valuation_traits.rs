use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::tasks::task_model::CancelFlag;
use crate::utils::time_utils::DateRange;
use crate::valuation::valuation_model::{RecomputeReport, SecurityValue};

/// Storage interface for derived daily security values.
#[async_trait]
pub trait SecurityValueRepositoryTrait: Send + Sync {
    /// Inserts or replaces rows keyed on (symbol, date).
    async fn upsert_values(&self, values: Vec<SecurityValue>) -> Result<()>;

    async fn get_value(&self, symbol: &str, date: NaiveDate) -> Result<Option<SecurityValue>>;

    /// Rows for one symbol within the range, date ascending.
    async fn get_values_in_range(&self, symbol: &str, range: DateRange)
        -> Result<Vec<SecurityValue>>;

    /// Rows for all symbols within the range, ordered by date then symbol.
    async fn get_all_values_in_range(&self, range: DateRange) -> Result<Vec<SecurityValue>>;

    /// Latest row per symbol.
    async fn get_latest_values(&self) -> Result<Vec<SecurityValue>>;

    /// Latest row for one symbol, if any.
    async fn get_latest_value(&self, symbol: &str) -> Result<Option<SecurityValue>>;
}

/// Valuation operations exposed to callers and the task pipeline.
#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    /// Rebuilds derived values for the given symbols (all ledger symbols
    /// when `None`) over the date range. Missing prices are reported as
    /// gaps, not errors. Safe to re-run; output depends only on ledger
    /// and quote contents.
    async fn recompute_valuation(
        &self,
        symbols: Option<Vec<String>>,
        range: DateRange,
        cancel: CancelFlag,
    ) -> Result<RecomputeReport>;

    /// Valuation row for one symbol on one date. Fails with a missing
    /// price data error when no row exists.
    async fn get_security_value(&self, symbol: &str, date: NaiveDate) -> Result<SecurityValue>;

    async fn get_security_values(&self, symbol: &str, range: DateRange)
        -> Result<Vec<SecurityValue>>;
}
