use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::ledger_model::HoldingTerm;

/// Desired share of the portfolio for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationTarget {
    pub symbol: String,
    pub sector: String,
    /// Fraction of total portfolio value, in `[0, 1]`.
    pub target_fraction: Decimal,
}

/// How a position sits relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftFlag {
    Underweight,
    Hold,
    Overweight,
}

impl DriftFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftFlag::Underweight => "UNDERWEIGHT",
            DriftFlag::Hold => "HOLD",
            DriftFlag::Overweight => "OVERWEIGHT",
        }
    }
}

impl std::str::FromStr for DriftFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNDERWEIGHT" => Ok(DriftFlag::Underweight),
            "HOLD" => Ok(DriftFlag::Hold),
            "OVERWEIGHT" => Ok(DriftFlag::Overweight),
            other => Err(format!("Unknown drift flag: {other}")),
        }
    }
}

/// Computed drift of one symbol against its target, as of a value date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationState {
    pub symbol: String,
    pub sector: String,
    pub current_value: Decimal,
    pub target_fraction: Decimal,
    /// Dollar target derived from the fraction and the total portfolio
    /// value at refresh time.
    pub target_value: Decimal,
    /// Current minus target, in currency units.
    pub drift: Decimal,
    /// Drift as a percent of target, zero when the target is zero.
    pub drift_pct: Decimal,
    pub flag: DriftFlag,
    pub as_of: NaiveDate,
}

/// Market indicators for one symbol, maintained externally and read by the
/// candidate screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndicators {
    pub symbol: String,
    pub price: Decimal,
    pub rsi: Decimal,
    /// Current P/E minus the symbol's historical average P/E.
    pub pe_diff: Decimal,
    pub volatility: Decimal,
    pub ma_50: Decimal,
    pub ma_200: Decimal,
    pub dividend_yield: Decimal,
    pub dividend_growth_rate: Decimal,
    /// Free-cash-flow to net-income ratio.
    pub fcf_ni_ratio: Decimal,
}

impl MarketIndicators {
    /// Relative distance of price above its 50-day moving average.
    pub fn ma_50_gap(&self) -> Decimal {
        if self.price.is_zero() {
            Decimal::ZERO
        } else {
            (self.price - self.ma_50) / self.price
        }
    }

    /// Relative distance of price above its 200-day moving average.
    pub fn ma_200_gap(&self) -> Decimal {
        if self.price.is_zero() {
            Decimal::ZERO
        } else {
            (self.price - self.ma_200) / self.price
        }
    }
}

/// One ranked buy candidate. Lower scores rank first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub symbol: String,
    pub sector: String,
    pub score: Decimal,
    pub drift: Decimal,
}

/// A profitable lot of an overweight position, eligible for trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimCandidate {
    pub symbol: String,
    pub sector: String,
    pub lot_id: i64,
    pub acquired: NaiveDate,
    pub units_remaining: Decimal,
    pub cost_basis: Decimal,
    pub current_value: Decimal,
    pub profit: Decimal,
    pub profit_pct: Decimal,
    /// Term the lot would realize if sold as of the drift date.
    pub holding_term: HoldingTerm,
    pub drift: Decimal,
}
