pub mod crossover;

pub use crossover::MovingAverageCrossover;

use common::{PriceSeries, Result, SignalFrame};

/// A trading rule that maps a price series to a flat/long signal per period.
///
/// Implementations must return a frame with exactly one signal per price
/// observation; build it with [`SignalFrame::from_signals`] so deltas follow
/// the shared first-period rule.
pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    /// Periods before the strategy's indicators use a full window
    fn warmup_periods(&self) -> usize {
        0
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalFrame>;
}
