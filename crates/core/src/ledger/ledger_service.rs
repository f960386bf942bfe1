use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::{LedgerError, Result, ValidationError};
use crate::ledger::ledger_model::{
    AmendTransaction, Disposition, NewTransaction, OpenLot, Transaction, TransactionType,
};
use crate::ledger::ledger_traits::{
    ConsumptionDraft, LedgerServiceTrait, TransactionDraft, TransactionRepositoryTrait,
};
use crate::ledger::lot_resolver::{resolve_sell, SellRequest};

/// Append-only transaction ledger with tax-lot resolution on sells.
///
/// Mutations to one symbol are serialized through a per-symbol lock so a
/// sell's read-resolve-write sequence never races a concurrent mutation of
/// the same lots. Different symbols proceed in parallel.
pub struct LedgerService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    symbol_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn TransactionRepositoryTrait>) -> Self {
        LedgerService {
            repository,
            symbol_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, symbol: &str) -> Arc<Mutex<()>> {
        self.symbol_locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn validate(new: &NewTransaction) -> Result<()> {
        if new.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if new.units <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "units",
                value: new.units,
            }
            .into());
        }
        if new.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "price",
                value: new.price,
            }
            .into());
        }
        if new.fee < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "fee must not be negative, got {}",
                new.fee
            ))
            .into());
        }
        if new.lot_ids.is_some() && new.txn_type != TransactionType::Sell {
            return Err(ValidationError::InvalidInput(
                "designated lots are only valid on sells".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn record_buy(&self, new: &NewTransaction) -> Result<Transaction> {
        self.repository
            .insert(TransactionDraft {
                symbol: new.symbol.clone(),
                txn_type: TransactionType::Buy,
                date: new.date,
                units: new.units,
                price: new.price,
                fee: new.fee,
                units_remaining: Some(new.units),
                disposition: Some(Disposition::Open),
                realized_gain: None,
                holding_term: None,
            })
            .await
    }

    async fn record_dividend(&self, new: &NewTransaction) -> Result<Transaction> {
        self.repository
            .insert(TransactionDraft {
                symbol: new.symbol.clone(),
                txn_type: TransactionType::Dividend,
                date: new.date,
                units: new.units,
                price: new.price,
                fee: new.fee,
                units_remaining: None,
                disposition: None,
                realized_gain: None,
                holding_term: None,
            })
            .await
    }

    async fn record_sell(&self, new: &NewTransaction) -> Result<Transaction> {
        let open_lots = self.repository.open_lots(Some(&new.symbol)).await?;
        let resolution = resolve_sell(
            &open_lots,
            &SellRequest {
                symbol: &new.symbol,
                date: new.date,
                units: new.units,
                price: new.price,
                fee: new.fee,
                lot_ids: new.lot_ids.as_deref(),
            },
        )?;

        debug!(
            "Sell of {} {} resolves to {} lot(s), realized gain {}",
            new.units,
            new.symbol,
            resolution.lots.len(),
            resolution.realized_gain
        );

        let consumptions = resolution
            .lots
            .iter()
            .map(|l| ConsumptionDraft {
                lot_id: l.lot_id,
                units: l.units,
                realized_gain: l.realized_gain,
                holding_term: l.holding_term,
            })
            .collect();

        self.repository
            .execute_sell(
                TransactionDraft {
                    symbol: new.symbol.clone(),
                    txn_type: TransactionType::Sell,
                    date: new.date,
                    units: new.units,
                    price: new.price,
                    fee: new.fee,
                    units_remaining: None,
                    disposition: None,
                    realized_gain: Some(resolution.realized_gain),
                    holding_term: resolution.holding_term,
                },
                consumptions,
            )
            .await
    }
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    async fn record_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        Self::validate(&new)?;

        let lock = self.lock_for(&new.symbol);
        let _guard = lock.lock().await;

        match new.txn_type {
            TransactionType::Buy => self.record_buy(&new).await,
            TransactionType::Dividend => self.record_dividend(&new).await,
            TransactionType::Sell => self.record_sell(&new).await,
        }
    }

    async fn amend_transaction(&self, amend: AmendTransaction) -> Result<Transaction> {
        if amend.units <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "units",
                value: amend.units,
            }
            .into());
        }
        if amend.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "price",
                value: amend.price,
            }
            .into());
        }

        let existing = self.repository.get(amend.id).await?;

        let lock = self.lock_for(&existing.symbol);
        let _guard = lock.lock().await;

        // Re-read under the lock; a sell may have touched the lot in the
        // window before acquisition.
        let mut txn = self.repository.get(amend.id).await?;

        match txn.txn_type {
            TransactionType::Sell => {
                return Err(LedgerError::AmendNotAllowed {
                    id: txn.id,
                    reason: "sells are immutable; their lot attribution is already recorded"
                        .to_string(),
                }
                .into());
            }
            TransactionType::Buy => {
                if txn.units_remaining != Some(txn.units) {
                    return Err(LedgerError::AmendNotAllowed {
                        id: txn.id,
                        reason: "lot has been partially or fully consumed by sells".to_string(),
                    }
                    .into());
                }
                txn.units_remaining = Some(amend.units);
            }
            TransactionType::Dividend => {}
        }

        txn.date = amend.date;
        txn.units = amend.units;
        txn.price = amend.price;
        txn.fee = amend.fee;

        self.repository.update(txn).await
    }

    async fn get_transaction(&self, id: i64) -> Result<Transaction> {
        self.repository.get(id).await
    }

    async fn get_transactions(&self, symbol: &str) -> Result<Vec<Transaction>> {
        self.repository.list_for_symbol(symbol).await
    }

    async fn get_open_lots(&self, symbol: Option<&str>) -> Result<Vec<OpenLot>> {
        self.repository.open_lots(symbol).await
    }

    async fn get_holdings(&self, symbol: &str) -> Result<Decimal> {
        let lots = self.repository.open_lots(Some(symbol)).await?;
        Ok(lots.iter().map(|l| l.units_remaining).sum())
    }
}
