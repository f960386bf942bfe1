use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily valuation state of one symbol, derived by replaying the ledger
/// against stored closes. One row per (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityValue {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
    /// Traded volume from the quote, absent when the feed had none.
    pub volume: Option<Decimal>,
    pub shares: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub cost_basis_per_share: Decimal,
    pub cum_dividends: Decimal,
    pub cum_realized_gain: Decimal,
    /// Total return percent: market value plus cumulative dividends and
    /// realized gains, over cost basis. Zero when the basis is zero.
    pub return_pct: Decimal,
}

/// A date that should have had a close price but did not. The date is
/// skipped, never interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceGap {
    pub symbol: String,
    pub date: NaiveDate,
}

/// Outcome of a valuation recompute run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    pub symbols_processed: usize,
    pub rows_written: usize,
    pub gaps: Vec<PriceGap>,
    /// Ledger id the run was computed against.
    pub ledger_watermark: i64,
    pub cancelled: bool,
}
