use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::{CURRENCY_SCALE, PERCENT_SCALE};
use crate::errors::Result;
use crate::history::history_model::HistoricalSnapshot;
use crate::history::history_traits::{HistoryServiceTrait, HistorySnapshotRepositoryTrait};
use crate::history::wma::weighted_moving_average;
use crate::settings::WmaSettings;
use crate::tasks::task_model::CancelFlag;
use crate::utils::time_utils::DateRange;
use crate::valuation::valuation_traits::SecurityValueRepositoryTrait;

/// Aggregates per-symbol daily values into portfolio snapshots and layers
/// weighted moving averages over the resulting return series.
///
/// Snapshots are derived state. Every run recomputes them from the stored
/// security values; nothing in here depends on previous snapshot contents.
pub struct HistoryService {
    value_repo: Arc<dyn SecurityValueRepositoryTrait>,
    snapshot_repo: Arc<dyn HistorySnapshotRepositoryTrait>,
    wma_settings: WmaSettings,
}

#[derive(Debug, Default, Clone)]
struct DayAggregate {
    total_value: Decimal,
    total_cost_basis: Decimal,
    cum_dividends: Decimal,
    cum_realized_gain: Decimal,
}

impl DayAggregate {
    fn return_pct(&self) -> Decimal {
        if self.total_cost_basis.is_zero() {
            return Decimal::ZERO;
        }
        ((self.total_value + self.cum_dividends + self.cum_realized_gain - self.total_cost_basis)
            / self.total_cost_basis
            * dec!(100))
        .round_dp(PERCENT_SCALE)
    }
}

impl HistoryService {
    pub fn new(
        value_repo: Arc<dyn SecurityValueRepositoryTrait>,
        snapshot_repo: Arc<dyn HistorySnapshotRepositoryTrait>,
        wma_settings: WmaSettings,
    ) -> Self {
        HistoryService {
            value_repo,
            snapshot_repo,
            wma_settings,
        }
    }

    /// How far before the range to read values so the longest window is
    /// full on the range's first day. Windows count trading days; the
    /// factor of two in calendar days absorbs weekends and holidays.
    fn lookback_start(&self, range_start: NaiveDate) -> NaiveDate {
        let max_window = self.wma_settings.max_window() as i64;
        range_start - Duration::days(2 * max_window)
    }
}

#[async_trait]
impl HistoryServiceTrait for HistoryService {
    async fn recompute_history(&self, range: DateRange, cancel: CancelFlag) -> Result<usize> {
        let read_range = DateRange::new(self.lookback_start(range.start), range.end);
        let values = self.value_repo.get_all_values_in_range(read_range).await?;

        let mut by_date: BTreeMap<NaiveDate, DayAggregate> = BTreeMap::new();
        for v in values {
            let agg = by_date.entry(v.date).or_default();
            agg.total_value += v.market_value;
            agg.total_cost_basis += v.cost_basis;
            agg.cum_dividends += v.cum_dividends;
            agg.cum_realized_gain += v.cum_realized_gain;
        }

        let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
        let returns: Vec<Decimal> = by_date.values().map(|a| a.return_pct()).collect();

        let mut snapshots = Vec::new();
        for (idx, date) in dates.iter().enumerate() {
            if !range.contains(*date) {
                continue;
            }
            if cancel.is_cancelled() {
                info!("History recompute cancelled at {date}");
                break;
            }

            let mut wma = BTreeMap::new();
            for &window in &self.wma_settings.windows {
                if let Some(avg) = weighted_moving_average(&returns[..=idx], window) {
                    wma.insert(window, avg);
                }
            }

            let agg = &by_date[date];
            snapshots.push(HistoricalSnapshot {
                date: *date,
                total_value: agg.total_value.round_dp(CURRENCY_SCALE),
                total_cost_basis: agg.total_cost_basis.round_dp(CURRENCY_SCALE),
                cum_dividends: agg.cum_dividends.round_dp(CURRENCY_SCALE),
                cum_realized_gain: agg.cum_realized_gain.round_dp(CURRENCY_SCALE),
                return_pct: returns[idx],
                wma,
            });
        }

        let written = snapshots.len();
        debug!("Writing {written} portfolio snapshots for {range:?}");
        self.snapshot_repo.upsert_snapshots(snapshots).await?;
        Ok(written)
    }

    async fn get_portfolio_history(&self, range: DateRange) -> Result<Vec<HistoricalSnapshot>> {
        self.snapshot_repo.get_snapshots_in_range(range).await
    }
}
