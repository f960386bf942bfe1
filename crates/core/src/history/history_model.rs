use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio-level valuation for one trading day, aggregated across all
/// symbols, with weighted moving averages of the return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSnapshot {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub total_cost_basis: Decimal,
    pub cum_dividends: Decimal,
    pub cum_realized_gain: Decimal,
    /// Portfolio return percent computed from the aggregate figures, not
    /// averaged across symbols.
    pub return_pct: Decimal,
    /// Weighted moving averages of `return_pct`, keyed by window length in
    /// trading days. A window absent here had too little history.
    pub wma: BTreeMap<u32, Decimal>,
}
