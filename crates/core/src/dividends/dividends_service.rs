use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::constants::CURRENCY_SCALE;
use crate::dividends::dividends_model::{
    DividendForecast, ForecastPoint, FrequencyReason, PaymentCadence, PaymentFrequency,
};
use crate::errors::Result;
use crate::ledger::ledger_traits::TransactionRepositoryTrait;
use crate::settings::DividendSettings;
use crate::utils::time_utils::{add_months, sub_months};

/// Dividend forecasting operations.
#[async_trait]
pub trait DividendServiceTrait: Send + Sync {
    /// Projects the next `periods` payments for a symbol from its trailing
    /// dividend history, as seen from `as_of`.
    async fn get_dividend_forecast(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        periods: usize,
    ) -> Result<DividendForecast>;
}

/// Projects dividends with an ordinary-least-squares line over the
/// payment series and classifies cadence from payment spacing.
pub struct DividendService {
    transaction_repo: Arc<dyn TransactionRepositoryTrait>,
    settings: DividendSettings,
}

impl DividendService {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepositoryTrait>,
        settings: DividendSettings,
    ) -> Self {
        DividendService {
            transaction_repo,
            settings,
        }
    }
}

#[async_trait]
impl DividendServiceTrait for DividendService {
    async fn get_dividend_forecast(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        periods: usize,
    ) -> Result<DividendForecast> {
        let since = sub_months(as_of, self.settings.lookback_for(symbol));
        let dividends = self
            .transaction_repo
            .dividends_for_symbol(symbol, since)
            .await?;

        let dates: Vec<NaiveDate> = dividends.iter().map(|d| d.date).collect();
        let amounts: Vec<Decimal> = dividends.iter().map(|d| d.dividend_cash()).collect();

        let frequency = if self.settings.is_monthly(symbol) {
            PaymentFrequency {
                cadence: PaymentCadence::Monthly,
                confidence: dec!(1),
                reason: FrequencyReason::Configured,
            }
        } else {
            detect_payment_frequency(&dates)
        };

        let points = match dates.last() {
            Some(&last_date) if !amounts.is_empty() => {
                let (slope, intercept) = fit_line(&amounts);
                let interval = frequency.cadence.interval_months();
                let n = Decimal::from(amounts.len() as u64);
                debug!(
                    "Dividend fit for {symbol}: {} payments, slope {slope}, intercept {intercept}",
                    amounts.len()
                );

                (1..=periods)
                    .map(|i| {
                        let x = n + Decimal::from((i as u32 * interval) as u64);
                        let amount = (intercept + slope * x)
                            .max(Decimal::ZERO)
                            .round_dp(CURRENCY_SCALE);
                        ForecastPoint {
                            date: project_date(last_date, i as u32 * interval),
                            amount,
                        }
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        Ok(DividendForecast {
            symbol: symbol.to_string(),
            frequency,
            observations: amounts.len(),
            points,
        })
    }
}

/// Least-squares slope and intercept of `y` against x = 1..n. A flat or
/// single-point series fits a horizontal line at its mean.
fn fit_line(y: &[Decimal]) -> (Decimal, Decimal) {
    let n = Decimal::from(y.len() as u64);
    if y.is_empty() {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let mut sum_x = Decimal::ZERO;
    let mut sum_y = Decimal::ZERO;
    let mut sum_xy = Decimal::ZERO;
    let mut sum_x2 = Decimal::ZERO;
    for (i, value) in y.iter().enumerate() {
        let x = Decimal::from(i as u64 + 1);
        sum_x += x;
        sum_y += *value;
        sum_xy += x * *value;
        sum_x2 += x * x;
    }

    let mean_x = sum_x / n;
    let mean_y = sum_y / n;
    let denominator = sum_x2 - n * mean_x * mean_x;
    if denominator.is_zero() {
        return (Decimal::ZERO, mean_y);
    }
    let slope = (sum_xy - n * mean_x * mean_y) / denominator;
    let intercept = mean_y - slope * mean_x;
    (slope, intercept)
}

/// Same day-of-month `months` months after `from`, clamped to the end of
/// shorter months.
fn project_date(from: NaiveDate, months: u32) -> NaiveDate {
    let month_first = add_months(from, months);
    let next_month_first = add_months(month_first, 1);
    let last_day = (next_month_first - chrono::Duration::days(1)).day();
    let day = from.day().min(last_day);
    NaiveDate::from_ymd_opt(month_first.year(), month_first.month(), day).unwrap_or(month_first)
}

/// Classifies payment cadence from the spacing of payment dates.
///
/// Tight interval patterns win: a mean gap of a month (25 to 35 days) with
/// low spread reads as monthly, a mean gap of a quarter (80 to 100 days)
/// as quarterly, each with confidence falling as the spread grows. When
/// the intervals are irregular the count of payments per year decides,
/// and fewer than three payments defaults to quarterly with no confidence.
pub fn detect_payment_frequency(dates: &[NaiveDate]) -> PaymentFrequency {
    if dates.len() < 3 {
        return PaymentFrequency {
            cadence: PaymentCadence::Quarterly,
            confidence: Decimal::ZERO,
            reason: FrequencyReason::InsufficientHistory,
        };
    }

    let mut sorted = dates.to_vec();
    sorted.sort();
    let intervals: Vec<Decimal> = sorted
        .windows(2)
        .map(|w| Decimal::from((w[1] - w[0]).num_days()))
        .collect();

    let n = Decimal::from(intervals.len() as u64);
    let mean: Decimal = intervals.iter().sum::<Decimal>() / n;
    let variance: Decimal = intervals
        .iter()
        .map(|i| {
            let d = *i - mean;
            d * d
        })
        .sum::<Decimal>()
        / n;
    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);

    if mean >= dec!(25) && mean <= dec!(35) && std_dev < dec!(10) {
        return PaymentFrequency {
            cadence: PaymentCadence::Monthly,
            confidence: dec!(0.9) - std_dev / dec!(100),
            reason: FrequencyReason::IntervalPattern,
        };
    }
    if mean >= dec!(80) && mean <= dec!(100) && std_dev < dec!(15) {
        return PaymentFrequency {
            cadence: PaymentCadence::Quarterly,
            confidence: dec!(0.9) - std_dev / dec!(150),
            reason: FrequencyReason::IntervalPattern,
        };
    }

    let span_days = Decimal::from((sorted[sorted.len() - 1] - sorted[0]).num_days().max(1));
    let per_year = Decimal::from(sorted.len() as u64) * dec!(365.25) / span_days;
    if per_year >= dec!(10) {
        return PaymentFrequency {
            cadence: PaymentCadence::Monthly,
            confidence: dec!(0.7),
            reason: FrequencyReason::PaymentsPerYear,
        };
    }
    if per_year >= dec!(3) && per_year <= dec!(5) {
        return PaymentFrequency {
            cadence: PaymentCadence::Quarterly,
            confidence: dec!(0.7),
            reason: FrequencyReason::PaymentsPerYear,
        };
    }

    PaymentFrequency {
        cadence: PaymentCadence::Quarterly,
        confidence: dec!(0.3),
        reason: FrequencyReason::PaymentsPerYear,
    }
}
