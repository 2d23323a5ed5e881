pub mod ema;
pub mod sma;

pub use ema::calculate_ema;
pub use sma::calculate_sma;

use common::MovingAverage;

/// Calculate the requested moving average over `prices`
pub fn moving_average(kind: MovingAverage, prices: &[f64], period: usize) -> Vec<f64> {
    match kind {
        MovingAverage::Simple => calculate_sma(prices, period),
        MovingAverage::Exponential => calculate_ema(prices, period),
    }
}
