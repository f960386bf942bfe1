pub mod dividends_model;
pub mod dividends_service;

pub use dividends_model::{
    DividendForecast, ForecastPoint, FrequencyReason, PaymentCadence, PaymentFrequency,
};
pub use dividends_service::{detect_payment_frequency, DividendService, DividendServiceTrait};

#[cfg(test)]
mod dividends_service_tests;
