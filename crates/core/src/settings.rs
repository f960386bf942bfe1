//! Engine configuration.
//!
//! All tunables carry documented defaults and are plain data: services
//! receive the settings they need by value or reference, nothing is held
//! in ambient globals.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Top-level engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub wma: WmaSettings,
    pub drift: DriftThresholds,
    pub candidates: CandidateThresholds,
    pub score_weights: ScoreWeights,
    pub dividends: DividendSettings,
}

/// Weighted-moving-average windows for the portfolio history series.
///
/// Windows count snapshot rows (trading days), not calendar days. The
/// weighting scheme is fixed engine-wide: linear decay, most recent row
/// weighted highest (`weight(i) = w - i` at offset `i` from the newest).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WmaSettings {
    pub windows: Vec<u32>,
}

impl Default for WmaSettings {
    fn default() -> Self {
        WmaSettings {
            // Short set plus the four year-scale windows (1-4 trading years).
            windows: vec![
                8, 24, 28, 36, 41, 48, 64, 72, 88, 110, 135, 160, 252, 504, 756, 1008,
            ],
        }
    }
}

impl WmaSettings {
    pub fn max_window(&self) -> u32 {
        self.windows.iter().copied().max().unwrap_or(0)
    }
}

/// Drift classification thresholds, in currency units.
///
/// Defaults: drift below -1 is Underweight, drift in [-1, 0) is Hold, and
/// drift at or above 0 is Overweight. The band is a fixed currency amount
/// regardless of position size, and zero itself counts as Overweight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftThresholds {
    /// Drift strictly below this value classifies as Underweight.
    pub underweight_below: Decimal,
    /// Drift at or above this value classifies as Overweight.
    pub overweight_at: Decimal,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        DriftThresholds {
            underweight_below: dec!(-1),
            overweight_at: Decimal::ZERO,
        }
    }
}

/// Thresholds for buy/trim candidate screening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateThresholds {
    /// Only symbols with drift below this bound qualify as buy candidates.
    pub buy_drift_below: Decimal,
    /// Maximum number of ranked buy candidates returned.
    pub buy_top_n: usize,
    /// Only symbols with drift above this bound are screened for trims.
    pub trim_drift_above: Decimal,
    /// Minimum absolute profit for a lot to be a trim candidate.
    pub trim_profit_min: Decimal,
    /// Minimum current value for a lot to be a trim candidate.
    pub trim_lot_value_min: Decimal,
}

impl Default for CandidateThresholds {
    fn default() -> Self {
        CandidateThresholds {
            buy_drift_below: dec!(-6),
            buy_top_n: 15,
            trim_drift_above: dec!(8.6),
            trim_profit_min: dec!(0.6),
            trim_lot_value_min: dec!(1.0),
        }
    }
}

/// Feature weights for the buy-candidate score.
///
/// Each feature is standardized to a z-score across the candidate set and
/// multiplied by its weight; candidates are ranked ascending, so negative
/// weights reward a high raw value and positive weights penalize it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeights {
    pub rsi: Decimal,
    pub pe_diff: Decimal,
    pub volatility: Decimal,
    pub ma_50_gap: Decimal,
    pub ma_200_gap: Decimal,
    pub dividend_yield: Decimal,
    pub dividend_growth_rate: Decimal,
    pub fcf_ni_ratio: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            rsi: dec!(1.1),
            pe_diff: dec!(1.0),
            volatility: dec!(0.8),
            ma_50_gap: dec!(0.85),
            ma_200_gap: dec!(1.2),
            dividend_yield: dec!(-1.3),
            dividend_growth_rate: dec!(-0.7),
            fcf_ni_ratio: dec!(-1.2),
        }
    }
}

/// Per-symbol dividend forecasting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DividendSettings {
    /// Default trailing lookback for the regression, in months.
    pub lookback_months: u32,
    /// Extended lookback for symbols with longer, cleaner histories.
    pub extended_lookback_months: u32,
    /// Symbols that use the extended lookback.
    pub extended_symbols: Vec<String>,
    /// Symbols known to pay monthly; everything else defaults to the
    /// auto-detected cadence (quarterly when detection is inconclusive).
    pub monthly_symbols: Vec<String>,
}

impl Default for DividendSettings {
    fn default() -> Self {
        DividendSettings {
            lookback_months: 24,
            extended_lookback_months: 36,
            extended_symbols: Vec::new(),
            monthly_symbols: Vec::new(),
        }
    }
}

impl DividendSettings {
    pub fn lookback_for(&self, symbol: &str) -> u32 {
        if self.extended_symbols.iter().any(|s| s == symbol) {
            self.extended_lookback_months
        } else {
            self.lookback_months
        }
    }

    pub fn is_monthly(&self, symbol: &str) -> bool {
        self.monthly_symbols.iter().any(|s| s == symbol)
    }
}
