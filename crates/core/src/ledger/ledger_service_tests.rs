use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

use crate::errors::{DatabaseError, Error, LedgerError, Result};
use crate::ledger::ledger_model::{
    quantity_threshold, AmendTransaction, Disposition, HoldingTerm, LotConsumption,
    NewTransaction, OpenLot, Transaction, TransactionType,
};
use crate::ledger::ledger_service::LedgerService;
use crate::ledger::ledger_traits::{
    ConsumptionDraft, LedgerServiceTrait, TransactionDraft, TransactionRepositoryTrait,
};

/// In-memory ledger repository mirroring the storage contract.
#[derive(Default)]
pub struct MockTransactionRepository {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    transactions: Vec<Transaction>,
    consumptions: Vec<LotConsumption>,
    next_id: i64,
}

impl MockTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(state: &mut MockState, draft: TransactionDraft) -> Transaction {
        state.next_id += 1;
        Transaction {
            id: state.next_id,
            symbol: draft.symbol,
            txn_type: draft.txn_type,
            date: draft.date,
            units: draft.units,
            price: draft.price,
            fee: draft.fee,
            units_remaining: draft.units_remaining,
            disposition: draft.disposition,
            realized_gain: draft.realized_gain,
            holding_term: draft.holding_term,
        }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for MockTransactionRepository {
    async fn insert(&self, draft: TransactionDraft) -> Result<Transaction> {
        let mut state = self.inner.lock().unwrap();
        let txn = Self::materialize(&mut state, draft);
        state.transactions.push(txn.clone());
        Ok(txn)
    }

    async fn execute_sell(
        &self,
        draft: TransactionDraft,
        consumptions: Vec<ConsumptionDraft>,
    ) -> Result<Transaction> {
        let mut state = self.inner.lock().unwrap();

        for c in &consumptions {
            let lot = state
                .transactions
                .iter()
                .find(|t| t.id == c.lot_id)
                .ok_or_else(|| Error::from(LedgerError::TransactionNotFound(c.lot_id)))?;
            let remaining = lot.units_remaining.unwrap_or(Decimal::ZERO);
            if remaining < c.units {
                return Err(DatabaseError::TransactionFailed(format!(
                    "lot {} has {} remaining, consumption wants {}",
                    c.lot_id, remaining, c.units
                ))
                .into());
            }
        }

        let sell = Self::materialize(&mut state, draft);
        state.transactions.push(sell.clone());

        for c in consumptions {
            let lot = state
                .transactions
                .iter_mut()
                .find(|t| t.id == c.lot_id)
                .expect("checked above");
            let remaining = lot.units_remaining.unwrap_or(Decimal::ZERO) - c.units;
            lot.units_remaining = Some(remaining);
            if remaining <= quantity_threshold() {
                lot.disposition = Some(Disposition::Sold);
            }

            let id = state.consumptions.len() as i64 + 1;
            state.consumptions.push(LotConsumption {
                id,
                sell_id: sell.id,
                lot_id: c.lot_id,
                units: c.units,
                realized_gain: c.realized_gain,
                holding_term: c.holding_term,
            });
        }

        Ok(sell)
    }

    async fn update(&self, txn: Transaction) -> Result<Transaction> {
        let mut state = self.inner.lock().unwrap();
        let slot = state
            .transactions
            .iter_mut()
            .find(|t| t.id == txn.id)
            .ok_or_else(|| Error::from(LedgerError::TransactionNotFound(txn.id)))?;
        *slot = txn.clone();
        Ok(txn)
    }

    async fn get(&self, id: i64) -> Result<Transaction> {
        let state = self.inner.lock().unwrap();
        state
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound(id).into())
    }

    async fn list_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>> {
        let state = self.inner.lock().unwrap();
        let mut rows: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn list_for_symbol_up_to(&self, symbol: &str, max_id: i64) -> Result<Vec<Transaction>> {
        let mut rows = self.list_for_symbol(symbol).await?;
        rows.retain(|t| t.id <= max_id);
        Ok(rows)
    }

    async fn open_lots(&self, symbol: Option<&str>) -> Result<Vec<OpenLot>> {
        let state = self.inner.lock().unwrap();
        let mut lots: Vec<OpenLot> = state
            .transactions
            .iter()
            .filter(|t| symbol.map_or(true, |s| t.symbol == s))
            .filter_map(|t| t.as_open_lot())
            .collect();
        lots.sort_by(|a, b| a.date.cmp(&b.date).then(a.lot_id.cmp(&b.lot_id)));
        Ok(lots)
    }

    async fn consumptions_for_symbol(&self, symbol: &str) -> Result<Vec<LotConsumption>> {
        let state = self.inner.lock().unwrap();
        let sell_ids: Vec<i64> = state
            .transactions
            .iter()
            .filter(|t| t.symbol == symbol && t.txn_type == TransactionType::Sell)
            .map(|t| t.id)
            .collect();
        Ok(state
            .consumptions
            .iter()
            .filter(|c| sell_ids.contains(&c.sell_id))
            .cloned()
            .collect())
    }

    async fn latest_id(&self) -> Result<i64> {
        let state = self.inner.lock().unwrap();
        Ok(state.next_id)
    }

    async fn latest_id_for_symbol(&self, symbol: &str) -> Result<i64> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.symbol == symbol)
            .map(|t| t.id)
            .max()
            .unwrap_or(0))
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        let mut symbols: Vec<String> = state
            .transactions
            .iter()
            .map(|t| t.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    async fn dividends_for_symbol(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let mut rows = self.list_for_symbol(symbol).await?;
        rows.retain(|t| t.txn_type == TransactionType::Dividend && t.date >= since);
        Ok(rows)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service() -> (LedgerService, Arc<MockTransactionRepository>) {
    let repo = Arc::new(MockTransactionRepository::new());
    (LedgerService::new(repo.clone()), repo)
}

fn buy(symbol: &str, d: NaiveDate, units: Decimal, price: Decimal, fee: Decimal) -> NewTransaction {
    NewTransaction {
        symbol: symbol.to_string(),
        txn_type: TransactionType::Buy,
        date: d,
        units,
        price,
        fee,
        lot_ids: None,
    }
}

fn sell(symbol: &str, d: NaiveDate, units: Decimal, price: Decimal) -> NewTransaction {
    NewTransaction {
        symbol: symbol.to_string(),
        txn_type: TransactionType::Sell,
        date: d,
        units,
        price,
        fee: Decimal::ZERO,
        lot_ids: None,
    }
}

#[tokio::test]
async fn buy_opens_a_lot_with_fee_in_basis() {
    let (svc, _) = service();

    let txn = svc
        .record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(1)))
        .await
        .unwrap();

    assert_eq!(txn.units_remaining, Some(dec!(10)));
    assert_eq!(txn.disposition, Some(Disposition::Open));

    let lots = svc.get_open_lots(Some("AAPL")).await.unwrap();
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].cost_basis, dec!(1001.00));
    assert_eq!(lots[0].cost_basis_per_share, dec!(100.100000));
}

#[tokio::test]
async fn sell_decrements_lots_and_records_consumptions() {
    let (svc, repo) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(1)))
        .await
        .unwrap();
    let sold = svc
        .record_transaction(sell("AAPL", date(2024, 6, 3), dec!(4), dec!(120)))
        .await
        .unwrap();

    assert_eq!(sold.realized_gain, Some(dec!(79.60)));
    assert_eq!(sold.holding_term, Some(HoldingTerm::Short));

    let lots = svc.get_open_lots(Some("AAPL")).await.unwrap();
    assert_eq!(lots[0].units_remaining, dec!(6));

    let consumptions = repo.consumptions_for_symbol("AAPL").await.unwrap();
    assert_eq!(consumptions.len(), 1);
    assert_eq!(consumptions[0].sell_id, sold.id);
    assert_eq!(consumptions[0].units, dec!(4));
    assert_eq!(consumptions[0].realized_gain, dec!(79.60));
}

#[tokio::test]
async fn full_consumption_closes_the_lot() {
    let (svc, _) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    svc.record_transaction(sell("AAPL", date(2024, 6, 3), dec!(10), dec!(120)))
        .await
        .unwrap();

    assert!(svc.get_open_lots(Some("AAPL")).await.unwrap().is_empty());
    assert_eq!(svc.get_holdings("AAPL").await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn oversell_leaves_ledger_untouched() {
    let (svc, _) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    let result = svc
        .record_transaction(sell("AAPL", date(2024, 6, 3), dec!(11), dec!(120)))
        .await;

    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientLots { .. }))
    ));
    assert_eq!(svc.get_holdings("AAPL").await.unwrap(), dec!(10));
    assert_eq!(svc.get_transactions("AAPL").await.unwrap().len(), 1);
}

#[tokio::test]
async fn designated_lot_sell_skips_fifo_order() {
    let (svc, repo) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    let newer = svc
        .record_transaction(buy("AAPL", date(2024, 3, 2), dec!(10), dec!(90), dec!(0)))
        .await
        .unwrap();

    let mut request = sell("AAPL", date(2024, 6, 3), dec!(5), dec!(120));
    request.lot_ids = Some(vec![newer.id]);
    let sold = svc.record_transaction(request).await.unwrap();

    let consumptions = repo.consumptions_for_symbol("AAPL").await.unwrap();
    assert_eq!(consumptions.len(), 1);
    assert_eq!(consumptions[0].lot_id, newer.id);
    assert_eq!(sold.realized_gain, Some(dec!(150.00)));

    let lots = svc.get_open_lots(Some("AAPL")).await.unwrap();
    assert_eq!(lots[0].units_remaining, dec!(10));
    assert_eq!(lots[1].units_remaining, dec!(5));
}

#[tokio::test]
async fn open_lots_without_symbol_span_the_ledger() {
    let (svc, _) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    svc.record_transaction(buy("MSFT", date(2024, 2, 2), dec!(5), dec!(300), dec!(0)))
        .await
        .unwrap();

    let all = svc.get_open_lots(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].symbol, "AAPL");
    assert_eq!(all[1].symbol, "MSFT");

    let scoped = svc.get_open_lots(Some("MSFT")).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].units_remaining, dec!(5));
}

#[tokio::test]
async fn amend_untouched_buy_rewrites_lot() {
    let (svc, _) = service();

    let bought = svc
        .record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();

    let amended = svc
        .amend_transaction(AmendTransaction {
            id: bought.id,
            date: date(2024, 1, 3),
            units: dec!(12),
            price: dec!(95),
            fee: dec!(2),
        })
        .await
        .unwrap();

    assert_eq!(amended.units, dec!(12));
    assert_eq!(amended.units_remaining, Some(dec!(12)));
    assert_eq!(svc.get_holdings("AAPL").await.unwrap(), dec!(12));
}

#[tokio::test]
async fn amend_rejected_once_lot_is_consumed() {
    let (svc, _) = service();

    let bought = svc
        .record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    svc.record_transaction(sell("AAPL", date(2024, 6, 3), dec!(1), dec!(120)))
        .await
        .unwrap();

    let result = svc
        .amend_transaction(AmendTransaction {
            id: bought.id,
            date: date(2024, 1, 2),
            units: dec!(20),
            price: dec!(100),
            fee: dec!(0),
        })
        .await;

    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::AmendNotAllowed { .. }))
    ));
}

#[tokio::test]
async fn amend_rejected_for_sells() {
    let (svc, _) = service();

    svc.record_transaction(buy("AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(0)))
        .await
        .unwrap();
    let sold = svc
        .record_transaction(sell("AAPL", date(2024, 6, 3), dec!(2), dec!(120)))
        .await
        .unwrap();

    let result = svc
        .amend_transaction(AmendTransaction {
            id: sold.id,
            date: date(2024, 6, 3),
            units: dec!(3),
            price: dec!(120),
            fee: dec!(0),
        })
        .await;

    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::AmendNotAllowed { .. }))
    ));
}

#[tokio::test]
async fn rejects_non_positive_units() {
    let (svc, _) = service();

    let result = svc
        .record_transaction(buy("AAPL", date(2024, 1, 2), dec!(0), dec!(100), dec!(0)))
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
}
