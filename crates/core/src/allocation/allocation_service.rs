use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::allocation::allocation_model::{
    AllocationState, AllocationTarget, CandidateScore, DriftFlag, TrimCandidate,
};
use crate::allocation::allocation_traits::{AllocationRepositoryTrait, AllocationServiceTrait};
use crate::allocation::scoring::score_candidates;
use crate::constants::{CURRENCY_SCALE, PERCENT_SCALE};
use crate::errors::{Result, ValidationError};
use crate::ledger::ledger_traits::TransactionRepositoryTrait;
use crate::ledger::lot_resolver::holding_term;
use crate::settings::{CandidateThresholds, DriftThresholds, ScoreWeights};
use crate::valuation::valuation_traits::SecurityValueRepositoryTrait;

/// Tracks positions against fractional targets and screens for buys and
/// trims.
///
/// Current values come from the latest stored security value per symbol,
/// so drift is only as fresh as the last valuation recompute.
pub struct AllocationService {
    allocation_repo: Arc<dyn AllocationRepositoryTrait>,
    transaction_repo: Arc<dyn TransactionRepositoryTrait>,
    value_repo: Arc<dyn SecurityValueRepositoryTrait>,
    drift_thresholds: DriftThresholds,
    candidate_thresholds: CandidateThresholds,
    score_weights: ScoreWeights,
}

impl AllocationService {
    pub fn new(
        allocation_repo: Arc<dyn AllocationRepositoryTrait>,
        transaction_repo: Arc<dyn TransactionRepositoryTrait>,
        value_repo: Arc<dyn SecurityValueRepositoryTrait>,
        drift_thresholds: DriftThresholds,
        candidate_thresholds: CandidateThresholds,
        score_weights: ScoreWeights,
    ) -> Self {
        AllocationService {
            allocation_repo,
            transaction_repo,
            value_repo,
            drift_thresholds,
            candidate_thresholds,
            score_weights,
        }
    }

    fn classify(&self, drift: Decimal) -> DriftFlag {
        if drift < self.drift_thresholds.underweight_below {
            DriftFlag::Underweight
        } else if drift < self.drift_thresholds.overweight_at {
            DriftFlag::Hold
        } else {
            DriftFlag::Overweight
        }
    }
}

#[async_trait]
impl AllocationServiceTrait for AllocationService {
    async fn set_target(&self, target: AllocationTarget) -> Result<()> {
        if target.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if target.target_fraction < Decimal::ZERO || target.target_fraction > Decimal::ONE {
            return Err(ValidationError::InvalidInput(format!(
                "target fraction must be within [0, 1], got {}",
                target.target_fraction
            ))
            .into());
        }
        self.allocation_repo.upsert_target(target).await
    }

    async fn refresh_drift(&self) -> Result<Vec<AllocationState>> {
        let targets = self.allocation_repo.get_targets().await?;
        let latest_values = self.value_repo.get_latest_values().await?;
        let by_symbol: HashMap<&str, (&Decimal, NaiveDate)> = latest_values
            .iter()
            .map(|v| (v.symbol.as_str(), (&v.market_value, v.date)))
            .collect();

        // Untargeted positions still count toward the denominator.
        let total: Decimal = latest_values.iter().map(|v| v.market_value).sum();

        let today = Local::now().date_naive();
        let mut states = Vec::with_capacity(targets.len());
        for target in &targets {
            // A target with no valuation yet is a fully missing position.
            let (current_value, as_of) = by_symbol
                .get(target.symbol.as_str())
                .map(|(v, d)| (**v, *d))
                .unwrap_or((Decimal::ZERO, today));

            let target_value = (target.target_fraction * total).round_dp(CURRENCY_SCALE);
            let drift = (current_value - target_value).round_dp(CURRENCY_SCALE);
            let drift_pct = if target_value.is_zero() {
                Decimal::ZERO
            } else {
                (drift / target_value * dec!(100)).round_dp(PERCENT_SCALE)
            };

            states.push(AllocationState {
                symbol: target.symbol.clone(),
                sector: target.sector.clone(),
                current_value,
                target_fraction: target.target_fraction,
                target_value,
                drift,
                drift_pct,
                flag: self.classify(drift),
                as_of,
            });
        }

        debug!("Refreshed drift for {} targets", states.len());
        self.allocation_repo.save_states(states.clone()).await?;
        Ok(states)
    }

    async fn get_allocation_drift(&self) -> Result<Vec<AllocationState>> {
        self.allocation_repo.get_states().await
    }

    async fn buy_candidates(&self) -> Result<Vec<CandidateScore>> {
        let states = self.allocation_repo.get_states().await?;
        let indicators = self.allocation_repo.get_indicators().await?;
        let by_symbol: HashMap<&str, &crate::allocation::allocation_model::MarketIndicators> =
            indicators.iter().map(|i| (i.symbol.as_str(), i)).collect();

        let mut candidates = Vec::new();
        for state in &states {
            if state.drift >= self.candidate_thresholds.buy_drift_below {
                continue;
            }
            // Symbols without indicators cannot be scored.
            if let Some(ind) = by_symbol.get(state.symbol.as_str()) {
                candidates.push(((*ind).clone(), state.clone()));
            }
        }

        // Nothing deep enough under target: rank the whole scorable set
        // instead of returning nothing.
        if candidates.is_empty() {
            for state in &states {
                if let Some(ind) = by_symbol.get(state.symbol.as_str()) {
                    candidates.push(((*ind).clone(), state.clone()));
                }
            }
        }

        let mut scores = score_candidates(&candidates, &self.score_weights);
        scores.truncate(self.candidate_thresholds.buy_top_n);
        Ok(scores)
    }

    async fn trim_candidates(&self) -> Result<Vec<TrimCandidate>> {
        let states = self.allocation_repo.get_states().await?;
        let mut candidates = Vec::new();

        for state in &states {
            if state.flag != DriftFlag::Overweight
                || state.drift <= self.candidate_thresholds.trim_drift_above
            {
                continue;
            }

            let close = match self.value_repo.get_latest_value(&state.symbol).await? {
                Some(v) => v.close,
                None => continue,
            };

            for lot in self.transaction_repo.open_lots(Some(&state.symbol)).await? {
                let current_value = (close * lot.units_remaining).round_dp(CURRENCY_SCALE);
                let basis = (lot.basis_per_unit() * lot.units_remaining).round_dp(CURRENCY_SCALE);
                let profit = current_value - basis;
                let profit_pct = if basis.is_zero() {
                    Decimal::ZERO
                } else {
                    (profit / basis * dec!(100)).round_dp(PERCENT_SCALE)
                };

                if profit < self.candidate_thresholds.trim_profit_min
                    || current_value < self.candidate_thresholds.trim_lot_value_min
                {
                    continue;
                }

                candidates.push(TrimCandidate {
                    symbol: state.symbol.clone(),
                    sector: state.sector.clone(),
                    lot_id: lot.lot_id,
                    acquired: lot.date,
                    units_remaining: lot.units_remaining,
                    cost_basis: basis,
                    current_value,
                    profit,
                    profit_pct,
                    holding_term: holding_term(lot.date, state.as_of),
                    drift: state.drift,
                });
            }
        }

        candidates.sort_by(|a, b| b.profit_pct.cmp(&a.profit_pct));
        Ok(candidates)
    }
}
