//! Linearly-weighted moving average over the portfolio return series.

use rust_decimal::Decimal;

use crate::constants::PERCENT_SCALE;

/// Weighted moving average of the last `window` values of `series`, with
/// linearly decaying weights: the newest value (end of the slice) gets
/// weight `window`, the oldest in the window gets weight 1.
///
/// Returns `None` when the series is shorter than the window. Partial
/// windows are never averaged.
pub fn weighted_moving_average(series: &[Decimal], window: u32) -> Option<Decimal> {
    let w = window as usize;
    if w == 0 || series.len() < w {
        return None;
    }

    let mut numerator = Decimal::ZERO;
    let mut denominator = Decimal::ZERO;
    for (i, value) in series[series.len() - w..].iter().enumerate() {
        // Offset from the oldest value in the window: weight 1..=window.
        let weight = Decimal::from(i as u32 + 1);
        numerator += *value * weight;
        denominator += weight;
    }

    Some((numerator / denominator).round_dp(PERCENT_SCALE))
}
