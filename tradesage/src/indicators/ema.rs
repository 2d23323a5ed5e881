/// Calculate Exponential Moving Average
///
/// Seeded with the first price so the output is defined from the first
/// period, like the simple average's expanding warm-up.
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - EMA span
///
/// # Returns
/// Vector of EMA values
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if n == 0 || period == 0 {
        return vec![];
    }

    let mut ema = vec![0.0; n];
    let multiplier = 2.0 / (period as f64 + 1.0);

    ema[0] = prices[0];

    for i in 1..n {
        ema[i] = (prices[i] - ema[i - 1]) * multiplier + ema[i - 1];
    }

    ema
}
