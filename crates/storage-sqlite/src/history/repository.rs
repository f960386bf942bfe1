use async_trait::async_trait;
use rusqlite::{params, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use lotfolio_core::errors::Result;
use lotfolio_core::history::history_model::HistoricalSnapshot;
use lotfolio_core::history::history_traits::HistorySnapshotRepositoryTrait;
use lotfolio_core::utils::time_utils::DateRange;

use crate::db::SqliteDb;
use crate::errors::map_sqlite_err;
use crate::utils::column_decimal;

/// SQLite-backed store for portfolio-level snapshots.
///
/// The moving-average map is stored as a JSON object keyed by window
/// length, mirroring the in-memory shape.
pub struct HistorySnapshotRepository {
    db: Arc<SqliteDb>,
}

impl HistorySnapshotRepository {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<HistoricalSnapshot> {
    let wma_json: String = row.get(6)?;
    let wma: BTreeMap<u32, Decimal> = serde_json::from_str(&wma_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(HistoricalSnapshot {
        date: row.get(0)?,
        total_value: column_decimal(1, row.get(1)?)?,
        total_cost_basis: column_decimal(2, row.get(2)?)?,
        cum_dividends: column_decimal(3, row.get(3)?)?,
        cum_realized_gain: column_decimal(4, row.get(4)?)?,
        return_pct: column_decimal(5, row.get(5)?)?,
        wma,
    })
}

#[async_trait]
impl HistorySnapshotRepositoryTrait for HistorySnapshotRepository {
    async fn upsert_snapshots(&self, snapshots: Vec<HistoricalSnapshot>) -> Result<()> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        for s in &snapshots {
            let wma_json = serde_json::to_string(&s.wma)?;
            tx.execute(
                "INSERT INTO historical_snapshots (snapshot_date, total_value, total_cost_basis, \
                 cum_dividends, cum_realized_gain, return_pct, wma) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT (snapshot_date) DO UPDATE SET \
                 total_value = excluded.total_value, \
                 total_cost_basis = excluded.total_cost_basis, \
                 cum_dividends = excluded.cum_dividends, \
                 cum_realized_gain = excluded.cum_realized_gain, \
                 return_pct = excluded.return_pct, wma = excluded.wma",
                params![
                    s.date,
                    s.total_value.to_string(),
                    s.total_cost_basis.to_string(),
                    s.cum_dividends.to_string(),
                    s.cum_realized_gain.to_string(),
                    s.return_pct.to_string(),
                    wma_json,
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        tx.commit().map_err(map_sqlite_err)
    }

    async fn get_snapshots_in_range(&self, range: DateRange) -> Result<Vec<HistoricalSnapshot>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT snapshot_date, total_value, total_cost_basis, cum_dividends, \
                 cum_realized_gain, return_pct, wma FROM historical_snapshots \
                 WHERE snapshot_date BETWEEN ?1 AND ?2 ORDER BY snapshot_date",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map(params![range.start, range.end], row_to_snapshot)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn get_latest_snapshot(&self) -> Result<Option<HistoricalSnapshot>> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT snapshot_date, total_value, total_cost_basis, cum_dividends, \
             cum_realized_gain, return_pct, wma FROM historical_snapshots \
             ORDER BY snapshot_date DESC LIMIT 1",
            [],
            row_to_snapshot,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(map_sqlite_err(other)),
        })
    }
}
