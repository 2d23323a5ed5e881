/// Calculate trailing Simple Moving Average
///
/// Before a full window is available the average is taken over the periods
/// seen so far (minimum one), so every period has a value. Callers that need
/// strict warm-up exclusion drop the first `period - 1` values themselves.
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - SMA period
///
/// # Returns
/// Vector of SMA values, same length as `prices`
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    if n == 0 || period == 0 {
        return vec![];
    }

    let mut sma = Vec::with_capacity(n);
    let mut sum = 0.0;

    for i in 0..n {
        sum += prices[i];
        if i >= period {
            sum -= prices[i - period];
        }
        let count = (i + 1).min(period);
        sma.push(sum / count as f64);
    }

    sma
}
