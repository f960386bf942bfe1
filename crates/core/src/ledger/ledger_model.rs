use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{CURRENCY_SCALE, PER_SHARE_SCALE, QUANTITY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            other => Err(format!("Unknown transaction type: {other}")),
        }
    }
}

/// Lifecycle of a buy lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Open,
    Sold,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Open => "OPEN",
            Disposition::Sold => "SOLD",
        }
    }
}

impl FromStr for Disposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPEN" => Ok(Disposition::Open),
            "SOLD" => Ok(Disposition::Sold),
            other => Err(format!("Unknown disposition: {other}")),
        }
    }
}

/// Tax character of a realized gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldingTerm {
    Short,
    Long,
}

impl HoldingTerm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingTerm::Short => "SHORT",
            HoldingTerm::Long => "LONG",
        }
    }
}

impl FromStr for HoldingTerm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SHORT" => Ok(HoldingTerm::Short),
            "LONG" => Ok(HoldingTerm::Long),
            other => Err(format!("Unknown holding term: {other}")),
        }
    }
}

/// One ledger row. Buys double as lots and carry `units_remaining` and
/// `disposition`; sells carry the aggregate `realized_gain` and, when every
/// consumed lot shares one term, a `holding_term`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub symbol: String,
    pub txn_type: TransactionType,
    pub date: NaiveDate,
    pub units: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub units_remaining: Option<Decimal>,
    pub disposition: Option<Disposition>,
    pub realized_gain: Option<Decimal>,
    pub holding_term: Option<HoldingTerm>,
}

impl Transaction {
    /// Total cost of a buy including fee. Zero for other types.
    pub fn cost_basis(&self) -> Decimal {
        match self.txn_type {
            TransactionType::Buy => self.price * self.units + self.fee,
            _ => Decimal::ZERO,
        }
    }

    /// Cash amount of a dividend row. Zero for other types.
    pub fn dividend_cash(&self) -> Decimal {
        match self.txn_type {
            TransactionType::Dividend => self.price * self.units,
            _ => Decimal::ZERO,
        }
    }

    pub fn is_open_lot(&self) -> bool {
        self.txn_type == TransactionType::Buy
            && self.disposition == Some(Disposition::Open)
            && self
                .units_remaining
                .map(|r| r > quantity_threshold())
                .unwrap_or(false)
    }

    /// View of an open buy row as a lot for the resolver.
    pub fn as_open_lot(&self) -> Option<OpenLot> {
        if !self.is_open_lot() {
            return None;
        }
        let units_remaining = self.units_remaining.unwrap_or(Decimal::ZERO);
        let cost_basis = self.cost_basis();
        let cost_basis_per_share = if self.units.is_zero() {
            Decimal::ZERO
        } else {
            cost_basis / self.units
        };
        Some(OpenLot {
            lot_id: self.id,
            symbol: self.symbol.clone(),
            date: self.date,
            units: self.units,
            units_remaining,
            price: self.price,
            fee: self.fee,
            cost_basis: cost_basis.round_dp(CURRENCY_SCALE),
            cost_basis_per_share: cost_basis_per_share.round_dp(PER_SHARE_SCALE),
        })
    }
}

pub fn quantity_threshold() -> Decimal {
    Decimal::from_str(QUANTITY_THRESHOLD).unwrap_or(Decimal::ZERO)
}

/// Caller-supplied transaction, before lot resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub symbol: String,
    pub txn_type: TransactionType,
    pub date: NaiveDate,
    pub units: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    /// Designated lots for a sell. `None` means FIFO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_ids: Option<Vec<i64>>,
}

/// Fields an amendment may change. Symbol and type are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub units: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
}

/// A buy lot with units still open, as exposed to callers and the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLot {
    pub lot_id: i64,
    pub symbol: String,
    pub date: NaiveDate,
    pub units: Decimal,
    pub units_remaining: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub cost_basis: Decimal,
    pub cost_basis_per_share: Decimal,
}

impl OpenLot {
    /// Unrounded per-unit basis including the buy fee, used for gain math.
    pub fn basis_per_unit(&self) -> Decimal {
        if self.units.is_zero() {
            Decimal::ZERO
        } else {
            (self.price * self.units + self.fee) / self.units
        }
    }
}

/// Persistent record of a sell consuming units from one lot. Stored
/// alongside the sell so any replay reproduces the exact lot attribution,
/// including designated-lot sells that FIFO would resolve differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotConsumption {
    pub id: i64,
    pub sell_id: i64,
    pub lot_id: i64,
    pub units: Decimal,
    pub realized_gain: Decimal,
    pub holding_term: HoldingTerm,
}

/// One lot's share of a resolved sell, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLot {
    pub lot_id: i64,
    pub units: Decimal,
    pub realized_gain: Decimal,
    pub holding_term: HoldingTerm,
}

/// Output of the lot resolver for one sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellResolution {
    pub lots: Vec<ResolvedLot>,
    pub realized_gain: Decimal,
    /// Set only when every consumed lot shares one term. Mixed sells leave
    /// this empty; the per-lot breakdown stays authoritative.
    pub holding_term: Option<HoldingTerm>,
}
