//! Pure lot-matching logic for sells.
//!
//! Given the open lots of a symbol and a sell request, decides which lots
//! are consumed, how much of each, and the realized gain per lot. No I/O:
//! the service layer fetches lots and persists the result.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::constants::{CURRENCY_SCALE, LONG_TERM_DAYS};
use crate::errors::LedgerError;
use crate::ledger::ledger_model::{
    quantity_threshold, HoldingTerm, OpenLot, ResolvedLot, SellResolution,
};

/// A sell to resolve against open lots.
#[derive(Debug, Clone)]
pub struct SellRequest<'a> {
    pub symbol: &'a str,
    pub date: NaiveDate,
    pub units: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    /// Designated lot order. `None` resolves FIFO.
    pub lot_ids: Option<&'a [i64]>,
}

/// Resolves a sell against the symbol's open lots.
///
/// FIFO order is purchase date, ties broken by lot id. With designated
/// lots, consumption follows the given order and every id must name an
/// open lot of the symbol. Either way the request fails whole if the
/// selected lots cannot cover the units; no partial consumption is
/// reported.
pub fn resolve_sell(
    open_lots: &[OpenLot],
    request: &SellRequest,
) -> Result<SellResolution, LedgerError> {
    let selected = match request.lot_ids {
        Some(ids) => select_designated(open_lots, ids, request.symbol)?,
        None => select_fifo(open_lots),
    };

    let available: Decimal = selected.iter().map(|l| l.units_remaining).sum();
    if available < request.units {
        return Err(LedgerError::InsufficientLots {
            symbol: request.symbol.to_string(),
            requested: request.units,
            available,
        });
    }

    Ok(consume(&selected, request))
}

fn select_fifo(open_lots: &[OpenLot]) -> Vec<OpenLot> {
    let mut lots: Vec<OpenLot> = open_lots.to_vec();
    lots.sort_by(|a, b| a.date.cmp(&b.date).then(a.lot_id.cmp(&b.lot_id)));
    lots
}

fn select_designated(
    open_lots: &[OpenLot],
    lot_ids: &[i64],
    symbol: &str,
) -> Result<Vec<OpenLot>, LedgerError> {
    let mut selected = Vec::with_capacity(lot_ids.len());
    for &lot_id in lot_ids {
        let lot = open_lots
            .iter()
            .find(|l| l.lot_id == lot_id)
            .ok_or_else(|| LedgerError::LotNotOpen {
                lot_id,
                symbol: symbol.to_string(),
            })?;
        selected.push(lot.clone());
    }
    Ok(selected)
}

fn consume(lots: &[OpenLot], request: &SellRequest) -> SellResolution {
    let mut resolved: Vec<ResolvedLot> = Vec::new();
    let mut remaining = request.units;
    let threshold = quantity_threshold();

    for lot in lots {
        if remaining <= threshold {
            break;
        }
        let take = remaining.min(lot.units_remaining);
        let term = holding_term(lot.date, request.date);
        resolved.push(ResolvedLot {
            lot_id: lot.lot_id,
            units: take,
            realized_gain: Decimal::ZERO,
            holding_term: term,
        });
        remaining -= take;
    }

    apply_gains(&mut resolved, lots, request);

    let realized_gain: Decimal = resolved.iter().map(|r| r.realized_gain).sum();
    let holding_term = uniform_term(&resolved);

    SellResolution {
        lots: resolved,
        realized_gain,
        holding_term,
    }
}

/// Fills in per-lot realized gains. The sell fee is allocated across
/// consumed lots in proportion to units, with the rounding remainder
/// assigned to the last lot so the allocations always sum to the fee.
fn apply_gains(resolved: &mut [ResolvedLot], lots: &[OpenLot], request: &SellRequest) {
    let total_units: Decimal = resolved.iter().map(|r| r.units).sum();
    if total_units.is_zero() {
        return;
    }

    let mut fee_allocated = Decimal::ZERO;
    let last = resolved.len().saturating_sub(1);
    for (i, entry) in resolved.iter_mut().enumerate() {
        let fee_share = if i == last {
            request.fee - fee_allocated
        } else {
            (request.fee * entry.units / total_units).round_dp(CURRENCY_SCALE)
        };
        fee_allocated += fee_share;

        let basis_per_unit = lots
            .iter()
            .find(|l| l.lot_id == entry.lot_id)
            .map(|l| l.basis_per_unit())
            .unwrap_or(Decimal::ZERO);
        let proceeds = request.price * entry.units - fee_share;
        let basis = basis_per_unit * entry.units;
        entry.realized_gain = (proceeds - basis).round_dp(CURRENCY_SCALE);
    }
}

fn uniform_term(resolved: &[ResolvedLot]) -> Option<HoldingTerm> {
    let mut terms = resolved.iter().map(|r| r.holding_term);
    let first = terms.next()?;
    terms.all(|t| t == first).then_some(first)
}

/// Long term at or past the one-year mark, short below it.
pub fn holding_term(acquired: NaiveDate, sold: NaiveDate) -> HoldingTerm {
    if (sold - acquired).num_days() >= LONG_TERM_DAYS {
        HoldingTerm::Long
    } else {
        HoldingTerm::Short
    }
}
