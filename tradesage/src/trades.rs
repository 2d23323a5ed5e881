//! Round-trip trade extraction from position deltas.

use common::{BacktestError, OpenPosition, PositionDelta, PriceSeries, Result, Trade};

/// Pairing state while scanning the delta series
#[derive(Debug, Clone, Copy, PartialEq)]
enum TradeState {
    Flat,
    InPosition { entry_index: usize },
}

/// Trades extracted from one series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLog {
    pub trades: Vec<Trade>,
    /// Entry with no later exit. Excluded from trade statistics.
    pub open_position: Option<OpenPosition>,
}

/// Pair each entry with the next exit.
///
/// An entry while already in a position and an exit while flat are ignored.
pub fn extract_trades(prices: &PriceSeries, deltas: &[PositionDelta]) -> Result<TradeLog> {
    if deltas.len() != prices.len() {
        return Err(BacktestError::LengthMismatch {
            expected: prices.len(),
            actual: deltas.len(),
        });
    }

    let points = prices.points();
    let mut trades = Vec::new();

    let end_state = deltas
        .iter()
        .enumerate()
        .try_fold(TradeState::Flat, |state, (i, delta)| {
            match (state, *delta) {
                (TradeState::Flat, PositionDelta::Enter) => {
                    Ok(TradeState::InPosition { entry_index: i })
                }
                (TradeState::InPosition { entry_index }, PositionDelta::Exit) => {
                    let entry = points[entry_index];
                    let exit = points[i];
                    if entry.close <= 0.0 {
                        return Err(BacktestError::InvalidPrice {
                            index: entry_index,
                            price: entry.close,
                        });
                    }
                    trades.push(Trade {
                        entry_date: entry.timestamp,
                        entry_price: entry.close,
                        exit_date: exit.timestamp,
                        exit_price: exit.close,
                        return_pct: (exit.close - entry.close) / entry.close,
                        holding_periods: i - entry_index,
                    });
                    Ok(TradeState::Flat)
                }
                _ => Ok(state),
            }
        })?;

    let open_position = match end_state {
        TradeState::InPosition { entry_index } => Some(OpenPosition {
            entry_date: points[entry_index].timestamp,
            entry_price: points[entry_index].close,
            entry_index,
        }),
        TradeState::Flat => None,
    };

    Ok(TradeLog {
        trades,
        open_position,
    })
}
