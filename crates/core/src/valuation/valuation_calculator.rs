//! Pure ledger replay.
//!
//! Rebuilds per-day valuation state for one symbol from its transactions,
//! their recorded lot consumptions, and daily closes. Deterministic: the
//! same inputs always produce the same rows, which is what makes the
//! recompute idempotent.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::constants::{CURRENCY_SCALE, PERCENT_SCALE, PER_SHARE_SCALE};
use crate::ledger::ledger_model::{LotConsumption, Transaction, TransactionType};
use crate::valuation::valuation_model::{PriceGap, SecurityValue};

/// Running position state while replaying a symbol's ledger.
#[derive(Debug, Default)]
pub struct LedgerReplay {
    shares: Decimal,
    cost_basis: Decimal,
    cum_dividends: Decimal,
    cum_realized_gain: Decimal,
    /// Per-lot unrounded basis per unit, for basis removal on sells.
    lot_basis: HashMap<i64, Decimal>,
}

impl LedgerReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transaction. Sells consult their recorded consumptions
    /// so basis removal matches the lots actually consumed, designated or
    /// FIFO alike.
    pub fn apply(&mut self, txn: &Transaction, consumptions_by_sell: &HashMap<i64, Vec<LotConsumption>>) {
        match txn.txn_type {
            TransactionType::Buy => {
                let basis = txn.price * txn.units + txn.fee;
                self.shares += txn.units;
                self.cost_basis += basis;
                if !txn.units.is_zero() {
                    self.lot_basis.insert(txn.id, basis / txn.units);
                }
            }
            TransactionType::Dividend => {
                self.cum_dividends += txn.price * txn.units;
            }
            TransactionType::Sell => {
                self.shares -= txn.units;
                self.cum_realized_gain += txn.realized_gain.unwrap_or(Decimal::ZERO);
                if let Some(consumptions) = consumptions_by_sell.get(&txn.id) {
                    for c in consumptions {
                        let basis_per_unit =
                            self.lot_basis.get(&c.lot_id).copied().unwrap_or(Decimal::ZERO);
                        self.cost_basis -= basis_per_unit * c.units;
                    }
                }
            }
        }
    }

    /// Valuation row for the current state at a close price.
    pub fn snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
        close: Decimal,
        volume: Option<Decimal>,
    ) -> SecurityValue {
        let market_value = close * self.shares;
        let return_pct = if self.cost_basis.is_zero() {
            Decimal::ZERO
        } else {
            ((market_value + self.cum_dividends + self.cum_realized_gain - self.cost_basis)
                / self.cost_basis
                * dec!(100))
            .round_dp(PERCENT_SCALE)
        };
        let cost_basis_per_share = if self.shares.is_zero() {
            Decimal::ZERO
        } else {
            (self.cost_basis / self.shares).round_dp(PER_SHARE_SCALE)
        };

        SecurityValue {
            symbol: symbol.to_string(),
            date,
            close,
            volume,
            shares: self.shares,
            market_value: market_value.round_dp(CURRENCY_SCALE),
            cost_basis: self.cost_basis.round_dp(CURRENCY_SCALE),
            cost_basis_per_share,
            cum_dividends: self.cum_dividends.round_dp(CURRENCY_SCALE),
            cum_realized_gain: self.cum_realized_gain.round_dp(CURRENCY_SCALE),
            return_pct,
        }
    }
}

/// Replays a symbol's full history and emits one row per trading day that
/// has a close price, starting no earlier than the first transaction.
///
/// `days` is the trading calendar to evaluate, ascending. A trading day on
/// or after the first transaction date with no close for this symbol is
/// reported as a gap and skipped, never interpolated. Days before the
/// symbol existed produce neither a row nor a gap.
pub fn replay_security_values(
    symbol: &str,
    transactions: &[Transaction],
    consumptions: &[LotConsumption],
    quotes: &HashMap<NaiveDate, (Decimal, Option<Decimal>)>,
    days: &[NaiveDate],
) -> (Vec<SecurityValue>, Vec<PriceGap>) {
    let first_date = match transactions.iter().map(|t| t.date).min() {
        Some(d) => d,
        None => return (Vec::new(), Vec::new()),
    };

    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

    let mut consumptions_by_sell: HashMap<i64, Vec<LotConsumption>> = HashMap::new();
    for c in consumptions {
        consumptions_by_sell.entry(c.sell_id).or_default().push(c.clone());
    }

    let mut replay = LedgerReplay::new();
    let mut next_txn = 0usize;
    let mut values = Vec::new();
    let mut gaps = Vec::new();

    for &day in days {
        while next_txn < sorted.len() && sorted[next_txn].date <= day {
            replay.apply(sorted[next_txn], &consumptions_by_sell);
            next_txn += 1;
        }
        if day < first_date {
            continue;
        }
        match quotes.get(&day) {
            Some(&(close, volume)) => values.push(replay.snapshot(symbol, day, close, volume)),
            None => gaps.push(PriceGap {
                symbol: symbol.to_string(),
                date: day,
            }),
        }
    }

    (values, gaps)
}
