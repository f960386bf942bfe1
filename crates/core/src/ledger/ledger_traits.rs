use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ledger::ledger_model::{
    AmendTransaction, Disposition, HoldingTerm, LotConsumption, NewTransaction, OpenLot,
    Transaction, TransactionType,
};

/// A fully-resolved ledger row ready for insertion. The repository assigns
/// the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
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

/// One lot's share of a sell, ready for insertion alongside the sell row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionDraft {
    pub lot_id: i64,
    pub units: Decimal,
    pub realized_gain: Decimal,
    pub holding_term: HoldingTerm,
}

/// Storage interface for the transaction ledger.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    async fn insert(&self, draft: TransactionDraft) -> Result<Transaction>;

    /// Atomically inserts the sell row, records its lot consumptions, and
    /// decrements `units_remaining` on each consumed lot (flipping the
    /// disposition to SOLD when a lot reaches zero). All or nothing.
    async fn execute_sell(
        &self,
        draft: TransactionDraft,
        consumptions: Vec<ConsumptionDraft>,
    ) -> Result<Transaction>;

    /// Rewrites the amendable fields of an existing row. Validation of
    /// what may be amended happens in the service layer.
    async fn update(&self, txn: Transaction) -> Result<Transaction>;

    async fn get(&self, id: i64) -> Result<Transaction>;

    /// All rows for a symbol in (date, id) order.
    async fn list_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>>;

    /// Rows for a symbol with id at or below `max_id`, in (date, id) order.
    /// Used to replay the ledger as of a watermark.
    async fn list_for_symbol_up_to(&self, symbol: &str, max_id: i64) -> Result<Vec<Transaction>>;

    /// Open buy lots in FIFO order, for one symbol or all of them.
    async fn open_lots(&self, symbol: Option<&str>) -> Result<Vec<OpenLot>>;

    /// Every lot consumption recorded against the symbol's sells.
    async fn consumptions_for_symbol(&self, symbol: &str) -> Result<Vec<LotConsumption>>;

    /// Highest transaction id in the ledger, 0 when empty.
    async fn latest_id(&self) -> Result<i64>;

    /// Highest transaction id for one symbol, 0 when none.
    async fn latest_id_for_symbol(&self, symbol: &str) -> Result<i64>;

    /// Distinct symbols with at least one transaction.
    async fn symbols(&self) -> Result<Vec<String>>;

    /// Dividend rows for a symbol on or after `since`, date ascending.
    async fn dividends_for_symbol(&self, symbol: &str, since: NaiveDate)
        -> Result<Vec<Transaction>>;
}

/// Ledger operations exposed to callers.
#[async_trait]
pub trait LedgerServiceTrait: Send + Sync {
    async fn record_transaction(&self, new: NewTransaction) -> Result<Transaction>;
    async fn amend_transaction(&self, amend: AmendTransaction) -> Result<Transaction>;
    async fn get_transaction(&self, id: i64) -> Result<Transaction>;
    async fn get_transactions(&self, symbol: &str) -> Result<Vec<Transaction>>;
    /// Open lots in FIFO order, scoped to one symbol when given.
    async fn get_open_lots(&self, symbol: Option<&str>) -> Result<Vec<OpenLot>>;
    /// Total open units per the ledger, zero when the symbol has no lots.
    async fn get_holdings(&self, symbol: &str) -> Result<Decimal>;
}
