use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Row};
use rust_decimal::Decimal;
use std::sync::Arc;

use lotfolio_core::errors::{DatabaseError, Result};
use lotfolio_core::ledger::ledger_model::{
    quantity_threshold, Disposition, LotConsumption, OpenLot, Transaction,
};
use lotfolio_core::ledger::ledger_traits::{
    ConsumptionDraft, TransactionDraft, TransactionRepositoryTrait,
};

use crate::db::SqliteDb;
use crate::errors::map_sqlite_err;
use crate::utils::{column_decimal, column_decimal_opt, column_enum, column_enum_opt};

const TXN_COLUMNS: &str = "id, symbol, txn_type, txn_date, units, price, fee, \
     units_remaining, disposition, realized_gain, holding_term";

/// SQLite-backed transaction ledger.
pub struct TransactionRepository {
    db: Arc<SqliteDb>,
}

impl TransactionRepository {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        symbol: row.get(1)?,
        txn_type: column_enum(2, row.get(2)?)?,
        date: row.get(3)?,
        units: column_decimal(4, row.get(4)?)?,
        price: column_decimal(5, row.get(5)?)?,
        fee: column_decimal(6, row.get(6)?)?,
        units_remaining: column_decimal_opt(7, row.get(7)?)?,
        disposition: column_enum_opt(8, row.get(8)?)?,
        realized_gain: column_decimal_opt(9, row.get(9)?)?,
        holding_term: column_enum_opt(10, row.get(10)?)?,
    })
}

fn row_to_consumption(row: &Row<'_>) -> rusqlite::Result<LotConsumption> {
    Ok(LotConsumption {
        id: row.get(0)?,
        sell_id: row.get(1)?,
        lot_id: row.get(2)?,
        units: column_decimal(3, row.get(3)?)?,
        realized_gain: column_decimal(4, row.get(4)?)?,
        holding_term: column_enum(5, row.get(5)?)?,
    })
}

fn insert_draft(conn: &rusqlite::Connection, draft: &TransactionDraft) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (symbol, txn_type, txn_date, units, price, fee, \
         units_remaining, disposition, realized_gain, holding_term) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            draft.symbol,
            draft.txn_type.as_str(),
            draft.date,
            draft.units.to_string(),
            draft.price.to_string(),
            draft.fee.to_string(),
            draft.units_remaining.map(|d| d.to_string()),
            draft.disposition.map(|d| d.as_str()),
            draft.realized_gain.map(|d| d.to_string()),
            draft.holding_term.map(|t| t.as_str()),
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

fn get_by_id(conn: &rusqlite::Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"),
        params![id],
        row_to_transaction,
    )
    .map_err(map_sqlite_err)
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn insert(&self, draft: TransactionDraft) -> Result<Transaction> {
        let conn = self.db.conn()?;
        let id = insert_draft(&conn, &draft)?;
        get_by_id(&conn, id)
    }

    async fn execute_sell(
        &self,
        draft: TransactionDraft,
        consumptions: Vec<ConsumptionDraft>,
    ) -> Result<Transaction> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;

        let sell_id = insert_draft(&tx, &draft)?;
        let threshold = quantity_threshold();

        for c in &consumptions {
            let remaining_str: String = tx
                .query_row(
                    "SELECT units_remaining FROM transactions WHERE id = ?1",
                    params![c.lot_id],
                    |row| row.get(0),
                )
                .map_err(map_sqlite_err)?;
            let remaining: Decimal = remaining_str.parse().map_err(|_| {
                DatabaseError::QueryFailed(format!(
                    "unreadable units_remaining on lot {}",
                    c.lot_id
                ))
            })?;
            // The resolver checked this against its own read; check again
            // inside the write transaction.
            if remaining < c.units {
                return Err(DatabaseError::TransactionFailed(format!(
                    "lot {} has {} remaining, consumption wants {}",
                    c.lot_id, remaining, c.units
                ))
                .into());
            }

            let new_remaining = remaining - c.units;
            let disposition = if new_remaining <= threshold {
                Disposition::Sold
            } else {
                Disposition::Open
            };
            tx.execute(
                "UPDATE transactions SET units_remaining = ?1, disposition = ?2 WHERE id = ?3",
                params![new_remaining.to_string(), disposition.as_str(), c.lot_id],
            )
            .map_err(map_sqlite_err)?;

            tx.execute(
                "INSERT INTO lot_consumptions (sell_id, lot_id, units, realized_gain, holding_term) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sell_id,
                    c.lot_id,
                    c.units.to_string(),
                    c.realized_gain.to_string(),
                    c.holding_term.as_str(),
                ],
            )
            .map_err(map_sqlite_err)?;
        }

        let sell = get_by_id(&tx, sell_id)?;
        tx.commit().map_err(map_sqlite_err)?;
        Ok(sell)
    }

    async fn update(&self, txn: Transaction) -> Result<Transaction> {
        let conn = self.db.conn()?;
        let changed = conn
            .execute(
                "UPDATE transactions SET txn_date = ?1, units = ?2, price = ?3, fee = ?4, \
                 units_remaining = ?5 WHERE id = ?6",
                params![
                    txn.date,
                    txn.units.to_string(),
                    txn.price.to_string(),
                    txn.fee.to_string(),
                    txn.units_remaining.map(|d| d.to_string()),
                    txn.id,
                ],
            )
            .map_err(map_sqlite_err)?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(format!("transaction {}", txn.id)).into());
        }
        get_by_id(&conn, txn.id)
    }

    async fn get(&self, id: i64) -> Result<Transaction> {
        let conn = self.db.conn()?;
        get_by_id(&conn, id)
    }

    async fn list_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TXN_COLUMNS} FROM transactions WHERE symbol = ?1 ORDER BY txn_date, id"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol], row_to_transaction)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn list_for_symbol_up_to(&self, symbol: &str, max_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TXN_COLUMNS} FROM transactions WHERE symbol = ?1 AND id <= ?2 \
                 ORDER BY txn_date, id"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol, max_id], row_to_transaction)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn open_lots(&self, symbol: Option<&str>) -> Result<Vec<OpenLot>> {
        let conn = self.db.conn()?;
        let transactions = match symbol {
            Some(symbol) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {TXN_COLUMNS} FROM transactions \
                         WHERE symbol = ?1 AND txn_type = 'BUY' AND disposition = 'OPEN' \
                         ORDER BY txn_date, id"
                    ))
                    .map_err(map_sqlite_err)?;
                let rows = stmt
                    .query_map(params![symbol], row_to_transaction)
                    .map_err(map_sqlite_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(map_sqlite_err)?
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {TXN_COLUMNS} FROM transactions \
                         WHERE txn_type = 'BUY' AND disposition = 'OPEN' \
                         ORDER BY txn_date, id"
                    ))
                    .map_err(map_sqlite_err)?;
                let rows = stmt
                    .query_map([], row_to_transaction)
                    .map_err(map_sqlite_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(map_sqlite_err)?
            }
        };
        Ok(transactions.iter().filter_map(|t| t.as_open_lot()).collect())
    }

    async fn consumptions_for_symbol(&self, symbol: &str) -> Result<Vec<LotConsumption>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.sell_id, c.lot_id, c.units, c.realized_gain, c.holding_term \
                 FROM lot_consumptions c \
                 JOIN transactions t ON t.id = c.sell_id \
                 WHERE t.symbol = ?1 ORDER BY c.id",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol], row_to_consumption)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn latest_id(&self) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM transactions",
            [],
            |row| row.get(0),
        )
        .map_err(map_sqlite_err)
    }

    async fn latest_id_for_symbol(&self, symbol: &str) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM transactions WHERE symbol = ?1",
            params![symbol],
            |row| row.get(0),
        )
        .map_err(map_sqlite_err)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM transactions ORDER BY symbol")
            .map_err(map_sqlite_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn dividends_for_symbol(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TXN_COLUMNS} FROM transactions \
                 WHERE symbol = ?1 AND txn_type = 'DIVIDEND' AND txn_date >= ?2 \
                 ORDER BY txn_date, id"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol, since], row_to_transaction)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }
}
