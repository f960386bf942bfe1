use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::errors::{RecomputeError, Result};
use crate::ledger::ledger_traits::TransactionRepositoryTrait;
use crate::quotes::quotes_traits::QuoteRepositoryTrait;
use crate::tasks::task_model::CancelFlag;
use crate::utils::time_utils::DateRange;
use crate::valuation::valuation_calculator::replay_security_values;
use crate::valuation::valuation_model::{RecomputeReport, SecurityValue};
use crate::valuation::valuation_traits::{SecurityValueRepositoryTrait, ValuationServiceTrait};

/// A symbol is retried this many times when the ledger moves under it
/// mid-replay before the run fails with a conflict.
const MAX_CONFLICT_RETRIES: usize = 3;

/// Rebuilds daily `SecurityValue` rows by replaying the ledger against
/// stored closes.
///
/// Each run captures a ledger watermark up front and replays every symbol
/// as of that watermark, so a run is a consistent snapshot even while new
/// transactions arrive. A symbol whose ledger advances mid-replay is
/// retried at its new watermark.
pub struct ValuationService {
    transaction_repo: Arc<dyn TransactionRepositoryTrait>,
    quote_repo: Arc<dyn QuoteRepositoryTrait>,
    value_repo: Arc<dyn SecurityValueRepositoryTrait>,
}

impl ValuationService {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepositoryTrait>,
        quote_repo: Arc<dyn QuoteRepositoryTrait>,
        value_repo: Arc<dyn SecurityValueRepositoryTrait>,
    ) -> Self {
        ValuationService {
            transaction_repo,
            quote_repo,
            value_repo,
        }
    }

    async fn recompute_symbol(
        &self,
        symbol: &str,
        quotes: &HashMap<NaiveDate, (Decimal, Option<Decimal>)>,
        trading_days: &[NaiveDate],
        report: &mut RecomputeReport,
    ) -> Result<()> {
        for attempt in 0..MAX_CONFLICT_RETRIES {
            let watermark = self.transaction_repo.latest_id_for_symbol(symbol).await?;
            let transactions = self
                .transaction_repo
                .list_for_symbol_up_to(symbol, watermark)
                .await?;
            let mut consumptions = self
                .transaction_repo
                .consumptions_for_symbol(symbol)
                .await?;
            consumptions.retain(|c| c.sell_id <= watermark);

            let (values, gaps) =
                replay_security_values(symbol, &transactions, &consumptions, quotes, trading_days);

            // The replay read the ledger in several queries; accept it only
            // if nothing moved for this symbol in between.
            let after = self.transaction_repo.latest_id_for_symbol(symbol).await?;
            if after != watermark {
                warn!(
                    "Ledger for {symbol} advanced from {watermark} to {after} during replay, retrying (attempt {})",
                    attempt + 1
                );
                continue;
            }

            debug!(
                "Recomputed {} value rows for {symbol} ({} gaps) at watermark {watermark}",
                values.len(),
                gaps.len()
            );
            report.rows_written += values.len();
            report.gaps.extend(gaps);
            self.value_repo.upsert_values(values).await?;
            return Ok(());
        }

        let watermark = self.transaction_repo.latest_id_for_symbol(symbol).await?;
        Err(RecomputeError::Conflict {
            symbol: symbol.to_string(),
            watermark,
        }
        .into())
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn recompute_valuation(
        &self,
        symbols: Option<Vec<String>>,
        range: DateRange,
        cancel: CancelFlag,
    ) -> Result<RecomputeReport> {
        let symbols = match symbols {
            Some(s) => s,
            None => self.transaction_repo.symbols().await?,
        };

        let mut report = RecomputeReport {
            ledger_watermark: self.transaction_repo.latest_id().await?,
            ..Default::default()
        };

        // The trading calendar is the union of quote dates across the
        // requested symbols. A symbol missing a close on a day the market
        // clearly traded is a gap; weekends and holidays are not.
        let mut quotes_by_symbol: HashMap<String, HashMap<NaiveDate, (Decimal, Option<Decimal>)>> =
            HashMap::new();
        let mut calendar: BTreeSet<NaiveDate> = BTreeSet::new();
        for symbol in &symbols {
            let quotes = self.quote_repo.get_quotes_in_range(symbol, range).await?;
            calendar.extend(quotes.iter().map(|q| q.date));
            quotes_by_symbol.insert(
                symbol.clone(),
                quotes
                    .into_iter()
                    .map(|q| (q.date, (q.close, q.volume)))
                    .collect(),
            );
        }
        let trading_days: Vec<NaiveDate> = calendar.into_iter().collect();

        for symbol in &symbols {
            if cancel.is_cancelled() {
                info!("Valuation recompute cancelled before {symbol}");
                report.cancelled = true;
                break;
            }
            let quotes = quotes_by_symbol.get(symbol).cloned().unwrap_or_default();
            self.recompute_symbol(symbol, &quotes, &trading_days, &mut report)
                .await?;
            report.symbols_processed += 1;
        }

        info!(
            "Valuation recompute wrote {} rows across {} symbols ({} gaps)",
            report.rows_written,
            report.symbols_processed,
            report.gaps.len()
        );
        Ok(report)
    }

    async fn get_security_value(&self, symbol: &str, date: NaiveDate) -> Result<SecurityValue> {
        self.value_repo
            .get_value(symbol, date)
            .await?
            .ok_or_else(|| {
                RecomputeError::MissingPriceData {
                    symbol: symbol.to_string(),
                    date,
                }
                .into()
            })
    }

    async fn get_security_values(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<SecurityValue>> {
        self.value_repo.get_values_in_range(symbol, range).await
    }
}
