//! Strategy returns and equity curve.
//!
//! A period's return is earned only if the previous period's signal was long,
//! so a signal can never trade on the price that produced it.

use common::config::validate_capital;
use common::{BacktestError, Position, PriceSeries, Result};

/// Raw period-over-period price change. The first period is 0.
///
/// Fails if a price used as a base for the next period is not positive.
pub fn price_returns(prices: &PriceSeries) -> Result<Vec<f64>> {
    let points = prices.points();
    let mut returns = Vec::with_capacity(points.len());
    returns.push(0.0);

    for (i, w) in points.windows(2).enumerate() {
        let prev = w[0].close;
        if prev <= 0.0 {
            return Err(BacktestError::InvalidPrice {
                index: i,
                price: prev,
            });
        }
        returns.push((w[1].close - prev) / prev);
    }

    Ok(returns)
}

/// Strategy return per period: price return times the previous signal.
pub fn compute_returns(prices: &PriceSeries, signals: &[Position]) -> Result<Vec<f64>> {
    if signals.len() != prices.len() {
        return Err(BacktestError::LengthMismatch {
            expected: prices.len(),
            actual: signals.len(),
        });
    }

    let raw = price_returns(prices)?;
    let lagged = std::iter::once(Position::Flat).chain(signals.iter().copied());

    Ok(raw
        .iter()
        .zip(lagged)
        .map(|(r, signal)| r * signal.exposure())
        .collect())
}

/// Equity after each period: `capital * prod(1 + r)` up to and including it.
pub fn compute_equity(returns: &[f64], initial_capital: f64) -> Result<Vec<f64>> {
    validate_capital(initial_capital)?;

    let mut equity = initial_capital;
    Ok(returns
        .iter()
        .map(|r| {
            equity *= 1.0 + r;
            equity
        })
        .collect())
}
