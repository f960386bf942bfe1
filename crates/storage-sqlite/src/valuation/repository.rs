use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Row};
use std::sync::Arc;

use lotfolio_core::errors::Result;
use lotfolio_core::utils::time_utils::DateRange;
use lotfolio_core::valuation::valuation_model::SecurityValue;
use lotfolio_core::valuation::valuation_traits::SecurityValueRepositoryTrait;

use crate::db::SqliteDb;
use crate::errors::map_sqlite_err;
use crate::utils::{column_decimal, column_decimal_opt};

const VALUE_COLUMNS: &str = "symbol, value_date, close, volume, shares, market_value, cost_basis, \
     cost_basis_per_share, cum_dividends, cum_realized_gain, return_pct";

/// SQLite-backed store for derived daily security values.
pub struct SecurityValueRepository {
    db: Arc<SqliteDb>,
}

impl SecurityValueRepository {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }
}

fn row_to_value(row: &Row<'_>) -> rusqlite::Result<SecurityValue> {
    Ok(SecurityValue {
        symbol: row.get(0)?,
        date: row.get(1)?,
        close: column_decimal(2, row.get(2)?)?,
        volume: column_decimal_opt(3, row.get(3)?)?,
        shares: column_decimal(4, row.get(4)?)?,
        market_value: column_decimal(5, row.get(5)?)?,
        cost_basis: column_decimal(6, row.get(6)?)?,
        cost_basis_per_share: column_decimal(7, row.get(7)?)?,
        cum_dividends: column_decimal(8, row.get(8)?)?,
        cum_realized_gain: column_decimal(9, row.get(9)?)?,
        return_pct: column_decimal(10, row.get(10)?)?,
    })
}

#[async_trait]
impl SecurityValueRepositoryTrait for SecurityValueRepository {
    async fn upsert_values(&self, values: Vec<SecurityValue>) -> Result<()> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        for v in &values {
            tx.execute(
                "INSERT INTO security_values (symbol, value_date, close, volume, shares, \
                 market_value, cost_basis, cost_basis_per_share, cum_dividends, \
                 cum_realized_gain, return_pct) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT (symbol, value_date) DO UPDATE SET \
                 close = excluded.close, volume = excluded.volume, shares = excluded.shares, \
                 market_value = excluded.market_value, cost_basis = excluded.cost_basis, \
                 cost_basis_per_share = excluded.cost_basis_per_share, \
                 cum_dividends = excluded.cum_dividends, \
                 cum_realized_gain = excluded.cum_realized_gain, \
                 return_pct = excluded.return_pct",
                params![
                    v.symbol,
                    v.date,
                    v.close.to_string(),
                    v.volume.map(|x| x.to_string()),
                    v.shares.to_string(),
                    v.market_value.to_string(),
                    v.cost_basis.to_string(),
                    v.cost_basis_per_share.to_string(),
                    v.cum_dividends.to_string(),
                    v.cum_realized_gain.to_string(),
                    v.return_pct.to_string(),
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        tx.commit().map_err(map_sqlite_err)
    }

    async fn get_value(&self, symbol: &str, date: NaiveDate) -> Result<Option<SecurityValue>> {
        let conn = self.db.conn()?;
        conn.query_row(
            &format!(
                "SELECT {VALUE_COLUMNS} FROM security_values \
                 WHERE symbol = ?1 AND value_date = ?2"
            ),
            params![symbol, date],
            row_to_value,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(map_sqlite_err(other)),
        })
    }

    async fn get_values_in_range(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<SecurityValue>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {VALUE_COLUMNS} FROM security_values \
                 WHERE symbol = ?1 AND value_date BETWEEN ?2 AND ?3 ORDER BY value_date"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol, range.start, range.end], row_to_value)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn get_all_values_in_range(&self, range: DateRange) -> Result<Vec<SecurityValue>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {VALUE_COLUMNS} FROM security_values \
                 WHERE value_date BETWEEN ?1 AND ?2 ORDER BY value_date, symbol"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![range.start, range.end], row_to_value)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn get_latest_values(&self) -> Result<Vec<SecurityValue>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {VALUE_COLUMNS} FROM security_values v \
                 WHERE value_date = (SELECT MAX(value_date) FROM security_values \
                 WHERE symbol = v.symbol) ORDER BY symbol"
            ))
            .map_err(map_sqlite_err)?;
        let rows = stmt.query_map([], row_to_value).map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn get_latest_value(&self, symbol: &str) -> Result<Option<SecurityValue>> {
        let conn = self.db.conn()?;
        conn.query_row(
            &format!(
                "SELECT {VALUE_COLUMNS} FROM security_values \
                 WHERE symbol = ?1 ORDER BY value_date DESC LIMIT 1"
            ),
            params![symbol],
            row_to_value,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(map_sqlite_err(other)),
        })
    }
}
