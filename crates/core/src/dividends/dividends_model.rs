use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How often a symbol pays dividends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentCadence {
    Monthly,
    Quarterly,
}

impl PaymentCadence {
    /// Months between payments.
    pub fn interval_months(&self) -> u32 {
        match self {
            PaymentCadence::Monthly => 1,
            PaymentCadence::Quarterly => 3,
        }
    }
}

/// How the cadence was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyReason {
    /// Payment intervals matched a cadence tightly.
    IntervalPattern,
    /// Intervals were irregular; classified by payments per year.
    PaymentsPerYear,
    /// Fewer than three payments on record.
    InsufficientHistory,
    /// Configured explicitly.
    Configured,
}

/// Detected payment cadence with a confidence estimate in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFrequency {
    pub cadence: PaymentCadence,
    pub confidence: Decimal,
    pub reason: FrequencyReason,
}

/// One projected payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Projected cash amount, never negative.
    pub amount: Decimal,
}

/// Linear projection of upcoming dividend payments from trailing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendForecast {
    pub symbol: String,
    pub frequency: PaymentFrequency,
    /// Payments observed inside the lookback window.
    pub observations: usize,
    pub points: Vec<ForecastPoint>,
}
