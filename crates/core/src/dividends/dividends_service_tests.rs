use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::dividends::dividends_model::{FrequencyReason, PaymentCadence};
use crate::dividends::dividends_service::{
    detect_payment_frequency, DividendService, DividendServiceTrait,
};
use crate::ledger::ledger_model::{NewTransaction, TransactionType};
use crate::ledger::ledger_service::LedgerService;
use crate::ledger::ledger_service_tests::MockTransactionRepository;
use crate::ledger::ledger_traits::LedgerServiceTrait;
use crate::settings::DividendSettings;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    ledger: LedgerService,
    service: DividendService,
}

fn fixture(settings: DividendSettings) -> Fixture {
    let repo = Arc::new(MockTransactionRepository::new());
    Fixture {
        ledger: LedgerService::new(repo.clone()),
        service: DividendService::new(repo, settings),
    }
}

async fn pay(fx: &Fixture, symbol: &str, d: NaiveDate, amount: Decimal) {
    fx.ledger
        .record_transaction(NewTransaction {
            symbol: symbol.to_string(),
            txn_type: TransactionType::Dividend,
            date: d,
            units: dec!(1),
            price: amount,
            fee: Decimal::ZERO,
            lot_ids: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn projects_linear_growth_forward() {
    let fx = fixture(DividendSettings::default());
    pay(&fx, "AAPL", date(2024, 1, 15), dec!(1.0)).await;
    pay(&fx, "AAPL", date(2024, 2, 15), dec!(1.1)).await;
    pay(&fx, "AAPL", date(2024, 3, 15), dec!(1.2)).await;

    let forecast = fx
        .service
        .get_dividend_forecast("AAPL", date(2024, 3, 20), 2)
        .await
        .unwrap();

    assert_eq!(forecast.observations, 3);
    assert_eq!(forecast.frequency.cadence, PaymentCadence::Monthly);
    assert_eq!(forecast.points.len(), 2);
    assert_eq!(forecast.points[0].date, date(2024, 4, 15));
    assert_eq!(forecast.points[0].amount, dec!(1.30));
    assert_eq!(forecast.points[1].date, date(2024, 5, 15));
    assert_eq!(forecast.points[1].amount, dec!(1.40));
}

#[tokio::test]
async fn declining_payments_never_project_below_zero() {
    let fx = fixture(DividendSettings::default());
    pay(&fx, "CUT", date(2024, 1, 15), dec!(1.2)).await;
    pay(&fx, "CUT", date(2024, 2, 15), dec!(0.8)).await;
    pay(&fx, "CUT", date(2024, 3, 15), dec!(0.4)).await;

    let forecast = fx
        .service
        .get_dividend_forecast("CUT", date(2024, 3, 20), 3)
        .await
        .unwrap();

    for point in &forecast.points {
        assert!(point.amount >= Decimal::ZERO);
    }
    assert_eq!(forecast.points[1].amount, Decimal::ZERO);
}

#[tokio::test]
async fn quarterly_payers_step_three_months() {
    let fx = fixture(DividendSettings::default());
    for (m, d) in [(1, 10), (4, 10), (7, 10), (10, 10)] {
        pay(&fx, "QTR", date(2023, m, d), dec!(2.0)).await;
    }

    let forecast = fx
        .service
        .get_dividend_forecast("QTR", date(2023, 10, 20), 2)
        .await
        .unwrap();

    assert_eq!(forecast.frequency.cadence, PaymentCadence::Quarterly);
    assert!(forecast.frequency.confidence > dec!(0.85));
    // Flat series projects its mean on a quarterly calendar.
    assert_eq!(forecast.points[0].date, date(2024, 1, 10));
    assert_eq!(forecast.points[0].amount, dec!(2.00));
    assert_eq!(forecast.points[1].date, date(2024, 4, 10));
}

#[tokio::test]
async fn month_end_payment_dates_clamp_to_shorter_months() {
    let fx = fixture(DividendSettings::default());
    pay(&fx, "EOM", date(2023, 11, 30), dec!(1.0)).await;
    pay(&fx, "EOM", date(2023, 12, 31), dec!(1.0)).await;
    pay(&fx, "EOM", date(2024, 1, 31), dec!(1.0)).await;

    let forecast = fx
        .service
        .get_dividend_forecast("EOM", date(2024, 2, 5), 1)
        .await
        .unwrap();

    assert_eq!(forecast.points[0].date, date(2024, 2, 29));
}

#[tokio::test]
async fn payments_outside_the_lookback_are_ignored() {
    let fx = fixture(DividendSettings::default());
    pay(&fx, "AAPL", date(2021, 1, 15), dec!(9.9)).await;
    pay(&fx, "AAPL", date(2024, 1, 15), dec!(1.0)).await;
    pay(&fx, "AAPL", date(2024, 2, 15), dec!(1.0)).await;
    pay(&fx, "AAPL", date(2024, 3, 15), dec!(1.0)).await;

    let forecast = fx
        .service
        .get_dividend_forecast("AAPL", date(2024, 3, 20), 1)
        .await
        .unwrap();

    assert_eq!(forecast.observations, 3);
    assert_eq!(forecast.points[0].amount, dec!(1.00));
}

#[tokio::test]
async fn configured_monthly_symbol_overrides_detection() {
    let fx = fixture(DividendSettings {
        monthly_symbols: vec!["MREIT".to_string()],
        ..DividendSettings::default()
    });
    for (m, d) in [(1, 10), (4, 10), (7, 10)] {
        pay(&fx, "MREIT", date(2024, m, d), dec!(0.5)).await;
    }

    let forecast = fx
        .service
        .get_dividend_forecast("MREIT", date(2024, 7, 20), 1)
        .await
        .unwrap();

    assert_eq!(forecast.frequency.cadence, PaymentCadence::Monthly);
    assert_eq!(forecast.frequency.reason, FrequencyReason::Configured);
    assert_eq!(forecast.points[0].date, date(2024, 8, 10));
}

#[tokio::test]
async fn no_history_yields_empty_forecast() {
    let fx = fixture(DividendSettings::default());

    let forecast = fx
        .service
        .get_dividend_forecast("NONE", date(2024, 3, 20), 4)
        .await
        .unwrap();

    assert_eq!(forecast.observations, 0);
    assert!(forecast.points.is_empty());
    assert_eq!(forecast.frequency.confidence, Decimal::ZERO);
}

#[test]
fn tight_monthly_intervals_detect_with_high_confidence() {
    let dates = vec![
        date(2024, 1, 15),
        date(2024, 2, 15),
        date(2024, 3, 15),
        date(2024, 4, 15),
    ];
    let freq = detect_payment_frequency(&dates);
    assert_eq!(freq.cadence, PaymentCadence::Monthly);
    assert_eq!(freq.reason, FrequencyReason::IntervalPattern);
    assert!(freq.confidence > dec!(0.85));
}

#[test]
fn two_payments_default_to_quarterly_with_no_confidence() {
    let dates = vec![date(2024, 1, 15), date(2024, 4, 15)];
    let freq = detect_payment_frequency(&dates);
    assert_eq!(freq.cadence, PaymentCadence::Quarterly);
    assert_eq!(freq.confidence, Decimal::ZERO);
    assert_eq!(freq.reason, FrequencyReason::InsufficientHistory);
}

#[test]
fn irregular_but_frequent_payments_fall_back_to_count_per_year() {
    // Twelve payments over one year with uneven spacing.
    let mut dates = Vec::new();
    for m in 1..=12 {
        dates.push(date(2024, m, if m % 2 == 0 { 3 } else { 25 }));
    }
    let freq = detect_payment_frequency(&dates);
    assert_eq!(freq.cadence, PaymentCadence::Monthly);
    assert_eq!(freq.reason, FrequencyReason::PaymentsPerYear);
    assert_eq!(freq.confidence, dec!(0.7));
}
