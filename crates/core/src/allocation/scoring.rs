//! Indicator scoring for buy candidates.
//!
//! Each indicator is standardized to a z-score across the candidate set so
//! no single raw scale dominates, then combined with signed weights. A low
//! combined score marks a cheaper, higher-yielding candidate.

use rust_decimal::{Decimal, MathematicalOps};

use crate::allocation::allocation_model::{AllocationState, CandidateScore, MarketIndicators};
use crate::constants::PERCENT_SCALE;
use crate::settings::ScoreWeights;

const FEATURE_COUNT: usize = 8;

fn features(ind: &MarketIndicators) -> [Decimal; FEATURE_COUNT] {
    [
        ind.rsi,
        ind.pe_diff,
        ind.volatility,
        ind.ma_50_gap(),
        ind.ma_200_gap(),
        ind.dividend_yield,
        ind.dividend_growth_rate,
        ind.fcf_ni_ratio,
    ]
}

fn weight_vector(weights: &ScoreWeights) -> [Decimal; FEATURE_COUNT] {
    [
        weights.rsi,
        weights.pe_diff,
        weights.volatility,
        weights.ma_50_gap,
        weights.ma_200_gap,
        weights.dividend_yield,
        weights.dividend_growth_rate,
        weights.fcf_ni_ratio,
    ]
}

/// Scores the candidate set. Each entry pairs a symbol's indicators with
/// its drift state; sector and drift are carried through to the output
/// untouched.
///
/// A feature with zero variance across the set contributes nothing to any
/// score. Output is sorted ascending, best candidates first.
pub fn score_candidates(
    candidates: &[(MarketIndicators, AllocationState)],
    weights: &ScoreWeights,
) -> Vec<CandidateScore> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let matrix: Vec<[Decimal; FEATURE_COUNT]> =
        candidates.iter().map(|(ind, _)| features(ind)).collect();
    let n = Decimal::from(matrix.len());
    let w = weight_vector(weights);

    let mut means = [Decimal::ZERO; FEATURE_COUNT];
    for row in &matrix {
        for (m, v) in means.iter_mut().zip(row.iter()) {
            *m += *v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut std_devs = [Decimal::ZERO; FEATURE_COUNT];
    for (f, std) in std_devs.iter_mut().enumerate() {
        let variance: Decimal = matrix
            .iter()
            .map(|row| {
                let d = row[f] - means[f];
                d * d
            })
            .sum::<Decimal>()
            / n;
        *std = variance.sqrt().unwrap_or(Decimal::ZERO);
    }

    let mut scores: Vec<CandidateScore> = candidates
        .iter()
        .zip(matrix.iter())
        .map(|((ind, state), row)| {
            let mut score = Decimal::ZERO;
            for f in 0..FEATURE_COUNT {
                if std_devs[f].is_zero() {
                    continue;
                }
                let z = (row[f] - means[f]) / std_devs[f];
                score += w[f] * z;
            }
            CandidateScore {
                symbol: ind.symbol.clone(),
                sector: state.sector.clone(),
                score: score.round_dp(PERCENT_SCALE),
                drift: state.drift,
            }
        })
        .collect();

    scores.sort_by(|a, b| a.score.cmp(&b.score).then(a.symbol.cmp(&b.symbol)));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::allocation_model::DriftFlag;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn state(symbol: &str, drift: Decimal) -> AllocationState {
        AllocationState {
            symbol: symbol.to_string(),
            sector: "TECH".to_string(),
            current_value: dec!(90),
            target_fraction: dec!(0.05),
            target_value: dec!(100),
            drift,
            drift_pct: Decimal::ZERO,
            flag: DriftFlag::Underweight,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
    }

    fn indicators(symbol: &str, rsi: Decimal, dividend_yield: Decimal) -> MarketIndicators {
        MarketIndicators {
            symbol: symbol.to_string(),
            price: dec!(100),
            rsi,
            pe_diff: dec!(0),
            volatility: dec!(0.2),
            ma_50: dec!(100),
            ma_200: dec!(100),
            dividend_yield,
            dividend_growth_rate: dec!(0.05),
            fcf_ni_ratio: dec!(1.1),
        }
    }

    #[test]
    fn lower_rsi_scores_better() {
        let candidates = vec![
            (indicators("HOT", dec!(80), dec!(0.03)), state("HOT", dec!(-10))),
            (indicators("COLD", dec!(20), dec!(0.03)), state("COLD", dec!(-10))),
        ];

        let scores = score_candidates(&candidates, &ScoreWeights::default());
        assert_eq!(scores[0].symbol, "COLD");
        assert!(scores[0].score < scores[1].score);
    }

    #[test]
    fn higher_yield_scores_better() {
        let candidates = vec![
            (indicators("LOWYLD", dec!(50), dec!(0.01)), state("LOWYLD", dec!(-10))),
            (indicators("HIYLD", dec!(50), dec!(0.06)), state("HIYLD", dec!(-10))),
        ];

        let scores = score_candidates(&candidates, &ScoreWeights::default());
        assert_eq!(scores[0].symbol, "HIYLD");
    }

    #[test]
    fn constant_features_do_not_contribute() {
        // All indicators identical: every z-score is zero.
        let candidates = vec![
            (indicators("A", dec!(50), dec!(0.03)), state("A", dec!(-5))),
            (indicators("B", dec!(50), dec!(0.03)), state("B", dec!(-5))),
        ];

        let scores = score_candidates(&candidates, &ScoreWeights::default());
        assert!(scores.iter().all(|s| s.score == Decimal::ZERO));
    }

    #[test]
    fn empty_set_yields_no_scores() {
        assert!(score_candidates(&[], &ScoreWeights::default()).is_empty());
    }
}
