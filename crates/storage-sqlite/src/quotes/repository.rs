use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Row};
use std::sync::Arc;

use lotfolio_core::errors::Result;
use lotfolio_core::quotes::quotes_model::Quote;
use lotfolio_core::quotes::quotes_traits::QuoteRepositoryTrait;
use lotfolio_core::utils::time_utils::DateRange;

use crate::db::SqliteDb;
use crate::errors::map_sqlite_err;
use crate::utils::{column_decimal, column_decimal_opt};

/// SQLite-backed daily close store.
pub struct QuoteRepository {
    db: Arc<SqliteDb>,
}

impl QuoteRepository {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }
}

fn row_to_quote(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        symbol: row.get(0)?,
        date: row.get(1)?,
        close: column_decimal(2, row.get(2)?)?,
        volume: column_decimal_opt(3, row.get(3)?)?,
    })
}

#[async_trait]
impl QuoteRepositoryTrait for QuoteRepository {
    async fn upsert_quotes(&self, quotes: Vec<Quote>) -> Result<()> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        for q in &quotes {
            tx.execute(
                "INSERT INTO quotes (symbol, quote_date, close, volume) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (symbol, quote_date) DO UPDATE SET \
                 close = excluded.close, volume = excluded.volume",
                params![
                    q.symbol,
                    q.date,
                    q.close.to_string(),
                    q.volume.map(|v| v.to_string())
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        tx.commit().map_err(map_sqlite_err)
    }

    async fn get_quote(&self, symbol: &str, date: NaiveDate) -> Result<Option<Quote>> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT symbol, quote_date, close, volume FROM quotes \
             WHERE symbol = ?1 AND quote_date = ?2",
            params![symbol, date],
            row_to_quote,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(map_sqlite_err(other)),
        })
    }

    async fn get_quotes_in_range(&self, symbol: &str, range: DateRange) -> Result<Vec<Quote>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, quote_date, close, volume FROM quotes \
                 WHERE symbol = ?1 AND quote_date BETWEEN ?2 AND ?3 ORDER BY quote_date",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![symbol, range.start, range.end], row_to_quote)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }
}
