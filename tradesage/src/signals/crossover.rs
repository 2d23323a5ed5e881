use common::config::validate_windows;
use common::{BacktestParameters, MovingAverage, Position, PriceSeries, Result, SignalFrame};

use super::Strategy;
use crate::indicators::moving_average;

/// Moving average crossover: long while the short average is strictly above
/// the long average, flat otherwise (ties are flat).
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageCrossover {
    short: usize,
    long: usize,
    kind: MovingAverage,
}

impl MovingAverageCrossover {
    /// Fails unless `0 < short < long`.
    pub fn new(short: usize, long: usize) -> Result<Self> {
        Self::with_kind(short, long, MovingAverage::Simple)
    }

    pub fn with_kind(short: usize, long: usize, kind: MovingAverage) -> Result<Self> {
        validate_windows(short, long)?;
        Ok(Self { short, long, kind })
    }

    pub fn from_params(params: &BacktestParameters) -> Result<Self> {
        Self::with_kind(params.short_window, params.long_window, params.moving_average)
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> String {
        let prefix = match self.kind {
            MovingAverage::Simple => "SMA",
            MovingAverage::Exponential => "EMA",
        };
        format!("{} Crossover ({}/{})", prefix, self.short, self.long)
    }

    fn warmup_periods(&self) -> usize {
        self.long - 1
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<SignalFrame> {
        let closes = prices.closes();
        let short_ma = moving_average(self.kind, &closes, self.short);
        let long_ma = moving_average(self.kind, &closes, self.long);

        let signals = short_ma
            .iter()
            .zip(&long_ma)
            .map(|(short, long)| {
                if short > long {
                    Position::Long
                } else {
                    Position::Flat
                }
            })
            .collect();

        Ok(SignalFrame::from_signals(signals, short_ma, long_ma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use common::{BacktestError, PositionDelta};

    fn make_series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<_> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceSeries::from_parts(&timestamps, closes).unwrap()
    }

    #[test]
    fn test_rejects_invalid_windows() {
        assert!(matches!(
            MovingAverageCrossover::new(5, 5),
            Err(BacktestError::InvalidWindows { short: 5, long: 5 })
        ));
        assert!(MovingAverageCrossover::new(10, 3).is_err());
        assert!(MovingAverageCrossover::new(0, 3).is_err());
    }

    #[test]
    fn test_growth_series_goes_long() {
        let strategy = MovingAverageCrossover::new(1, 2).unwrap();
        let frame = strategy
            .generate_signals(&make_series(&[100.0, 110.0, 121.0]))
            .unwrap();

        // first period: both averages equal the first price, tie is flat
        assert_eq!(
            frame.signals,
            vec![Position::Flat, Position::Long, Position::Long]
        );
        assert_eq!(
            frame.deltas,
            vec![PositionDelta::Hold, PositionDelta::Enter, PositionDelta::Hold]
        );
        assert_eq!(frame.long_ma[1], 105.0);
    }

    #[test]
    fn test_cross_down_exits() {
        let strategy = MovingAverageCrossover::new(1, 3).unwrap();
        let frame = strategy
            .generate_signals(&make_series(&[10.0, 11.0, 12.0, 9.0, 8.0]))
            .unwrap();

        let values: Vec<i8> = frame.signals.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![0, 1, 1, 0, 0]);
        let deltas: Vec<i8> = frame.deltas.iter().map(|d| d.value()).collect();
        assert_eq!(deltas, vec![0, 1, 0, -1, 0]);
    }

    #[test]
    fn test_constant_prices_stay_flat() {
        for kind in [MovingAverage::Simple, MovingAverage::Exponential] {
            let strategy = MovingAverageCrossover::with_kind(2, 4, kind).unwrap();
            let frame = strategy.generate_signals(&make_series(&[50.0; 10])).unwrap();
            assert!(frame.signals.iter().all(|s| *s == Position::Flat));
            assert!(frame.deltas.iter().all(|d| *d == PositionDelta::Hold));
        }
    }

    #[test]
    fn test_exponential_variant() {
        let strategy =
            MovingAverageCrossover::with_kind(2, 5, MovingAverage::Exponential).unwrap();
        let frame = strategy
            .generate_signals(&make_series(&[10.0, 11.0, 12.0, 13.0]))
            .unwrap();

        assert_eq!(frame.len(), 4);
        assert_eq!(frame.signals[0], Position::Flat);
        // the faster EMA leads in a rising market
        assert!(frame.signals[1..].iter().all(|s| s.is_long()));
        assert_eq!(strategy.name(), "EMA Crossover (2/5)");
    }

    #[test]
    fn test_warmup_and_name() {
        let strategy = MovingAverageCrossover::new(50, 200).unwrap();
        assert_eq!(strategy.warmup_periods(), 199);
        assert_eq!(strategy.name(), "SMA Crossover (50/200)");
    }
}
