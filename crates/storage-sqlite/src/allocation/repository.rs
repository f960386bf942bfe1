use async_trait::async_trait;
use rusqlite::{params, Row};
use std::sync::Arc;

use lotfolio_core::allocation::allocation_model::{
    AllocationState, AllocationTarget, MarketIndicators,
};
use lotfolio_core::allocation::allocation_traits::AllocationRepositoryTrait;
use lotfolio_core::errors::Result;

use crate::db::SqliteDb;
use crate::errors::map_sqlite_err;
use crate::utils::{column_decimal, column_enum};

/// SQLite-backed store for targets, drift states, and market indicators.
pub struct AllocationRepository {
    db: Arc<SqliteDb>,
}

impl AllocationRepository {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }
}

fn row_to_target(row: &Row<'_>) -> rusqlite::Result<AllocationTarget> {
    Ok(AllocationTarget {
        symbol: row.get(0)?,
        sector: row.get(1)?,
        target_fraction: column_decimal(2, row.get(2)?)?,
    })
}

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<AllocationState> {
    Ok(AllocationState {
        symbol: row.get(0)?,
        sector: row.get(1)?,
        current_value: column_decimal(2, row.get(2)?)?,
        target_fraction: column_decimal(3, row.get(3)?)?,
        target_value: column_decimal(4, row.get(4)?)?,
        drift: column_decimal(5, row.get(5)?)?,
        drift_pct: column_decimal(6, row.get(6)?)?,
        flag: column_enum(7, row.get(7)?)?,
        as_of: row.get(8)?,
    })
}

fn row_to_indicators(row: &Row<'_>) -> rusqlite::Result<MarketIndicators> {
    Ok(MarketIndicators {
        symbol: row.get(0)?,
        price: column_decimal(1, row.get(1)?)?,
        rsi: column_decimal(2, row.get(2)?)?,
        pe_diff: column_decimal(3, row.get(3)?)?,
        volatility: column_decimal(4, row.get(4)?)?,
        ma_50: column_decimal(5, row.get(5)?)?,
        ma_200: column_decimal(6, row.get(6)?)?,
        dividend_yield: column_decimal(7, row.get(7)?)?,
        dividend_growth_rate: column_decimal(8, row.get(8)?)?,
        fcf_ni_ratio: column_decimal(9, row.get(9)?)?,
    })
}

#[async_trait]
impl AllocationRepositoryTrait for AllocationRepository {
    async fn upsert_target(&self, target: AllocationTarget) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO allocation_targets (symbol, sector, target_fraction) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (symbol) DO UPDATE SET \
             sector = excluded.sector, target_fraction = excluded.target_fraction",
            params![
                target.symbol,
                target.sector,
                target.target_fraction.to_string()
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(())
    }

    async fn get_targets(&self) -> Result<Vec<AllocationTarget>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare("SELECT symbol, sector, target_fraction FROM allocation_targets ORDER BY symbol")
            .map_err(map_sqlite_err)?;
        let rows = stmt.query_map([], row_to_target).map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn save_states(&self, states: Vec<AllocationState>) -> Result<()> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        tx.execute("DELETE FROM allocation_states", [])
            .map_err(map_sqlite_err)?;
        for s in &states {
            tx.execute(
                "INSERT INTO allocation_states (symbol, sector, current_value, target_fraction, \
                 target_value, drift, drift_pct, flag, as_of) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    s.symbol,
                    s.sector,
                    s.current_value.to_string(),
                    s.target_fraction.to_string(),
                    s.target_value.to_string(),
                    s.drift.to_string(),
                    s.drift_pct.to_string(),
                    s.flag.as_str(),
                    s.as_of,
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        tx.commit().map_err(map_sqlite_err)
    }

    async fn get_states(&self) -> Result<Vec<AllocationState>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, sector, current_value, target_fraction, target_value, drift, \
                 drift_pct, flag, as_of FROM allocation_states ORDER BY symbol",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt.query_map([], row_to_state).map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }

    async fn upsert_indicators(&self, indicators: Vec<MarketIndicators>) -> Result<()> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction().map_err(map_sqlite_err)?;
        for i in &indicators {
            tx.execute(
                "INSERT INTO market_indicators (symbol, price, rsi, pe_diff, volatility, ma_50, \
                 ma_200, dividend_yield, dividend_growth_rate, fcf_ni_ratio) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT (symbol) DO UPDATE SET \
                 price = excluded.price, rsi = excluded.rsi, pe_diff = excluded.pe_diff, \
                 volatility = excluded.volatility, ma_50 = excluded.ma_50, \
                 ma_200 = excluded.ma_200, dividend_yield = excluded.dividend_yield, \
                 dividend_growth_rate = excluded.dividend_growth_rate, \
                 fcf_ni_ratio = excluded.fcf_ni_ratio",
                params![
                    i.symbol,
                    i.price.to_string(),
                    i.rsi.to_string(),
                    i.pe_diff.to_string(),
                    i.volatility.to_string(),
                    i.ma_50.to_string(),
                    i.ma_200.to_string(),
                    i.dividend_yield.to_string(),
                    i.dividend_growth_rate.to_string(),
                    i.fcf_ni_ratio.to_string(),
                ],
            )
            .map_err(map_sqlite_err)?;
        }
        tx.commit().map_err(map_sqlite_err)
    }

    async fn get_indicators(&self) -> Result<Vec<MarketIndicators>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, price, rsi, pe_diff, volatility, ma_50, ma_200, dividend_yield, \
                 dividend_growth_rate, fcf_ni_ratio FROM market_indicators ORDER BY symbol",
            )
            .map_err(map_sqlite_err)?;
        let rows = stmt
            .query_map([], row_to_indicators)
            .map_err(map_sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite_err)
    }
}
