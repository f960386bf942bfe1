use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily close for a symbol. One row per (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
    /// Shares traded that day, when the feed reports it.
    pub volume: Option<Decimal>,
}
