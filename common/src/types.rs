use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BacktestParameters;
use crate::error::{BacktestError, Result};

/// One end-of-day closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Validated closing price history.
///
/// At least one row, strictly increasing timestamps, finite non-negative
/// prices. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(BacktestError::EmptySeries);
        }

        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close < 0.0 {
                return Err(BacktestError::InvalidPrice {
                    index,
                    price: point.close,
                });
            }
            if index > 0 && point.timestamp <= points[index - 1].timestamp {
                return Err(BacktestError::NonIncreasingTimestamp { index });
            }
        }

        Ok(Self { points })
    }

    /// Build from parallel timestamp/close slices
    pub fn from_parts(timestamps: &[DateTime<Utc>], closes: &[f64]) -> Result<Self> {
        if timestamps.len() != closes.len() {
            return Err(BacktestError::LengthMismatch {
                expected: timestamps.len(),
                actual: closes.len(),
            });
        }
        Self::new(
            timestamps
                .iter()
                .zip(closes)
                .map(|(&timestamp, &close)| PricePoint { timestamp, close })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }
}

/// Desired position state at a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long,
}

impl Position {
    /// 0 for flat, 1 for long
    pub fn value(self) -> i8 {
        match self {
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn is_long(self) -> bool {
        self == Position::Long
    }

    /// Exposure multiplier applied to the next period's price return
    pub fn exposure(self) -> f64 {
        f64::from(self.value())
    }
}

/// Period-over-period change in position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionDelta {
    /// -1: exit long
    Exit,
    /// 0: no change
    #[default]
    Hold,
    /// +1: enter long
    Enter,
}

impl PositionDelta {
    pub fn between(previous: Position, current: Position) -> Self {
        match current.value() - previous.value() {
            1 => PositionDelta::Enter,
            -1 => PositionDelta::Exit,
            _ => PositionDelta::Hold,
        }
    }

    pub fn value(self) -> i8 {
        match self {
            PositionDelta::Exit => -1,
            PositionDelta::Hold => 0,
            PositionDelta::Enter => 1,
        }
    }
}

/// Completed round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
    /// (exit - entry) / entry
    pub return_pct: f64,
    pub holding_periods: usize,
}

/// Long position still open when the series ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub entry_index: usize,
}

/// Fixed-key performance report.
///
/// Undefined ratios hold `f64::NAN` (or `f64::INFINITY` for a profit factor
/// with no losing trades) instead of raising.
///
/// Known quirks kept for compatibility with existing reports:
/// `total_trades` counts entry and exit events, not completed round trips,
/// and `best_trade`/`worst_trade` are the extreme *period* returns. The
/// round-trip extremes are reported separately in `best_round_trip` and
/// `worst_round_trip`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // Returns
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub final_equity: f64,
    // Risk metrics
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub calmar_ratio: f64,
    // Trade statistics
    pub total_trades: u32,
    pub completed_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub avg_trade_return: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub best_round_trip: f64,
    pub worst_round_trip: f64,
    pub exposure: f64,
}

impl PerformanceReport {
    /// Metric name/value pairs in report order
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Cumulative Return", self.cumulative_return),
            ("Annualized Return", self.annualized_return),
            ("Annualized Volatility", self.annualized_volatility),
            ("Sharpe Ratio", self.sharpe_ratio),
            ("Sortino Ratio", self.sortino_ratio),
            ("Max Drawdown", self.max_drawdown),
            ("Calmar Ratio", self.calmar_ratio),
            ("Total Trades", f64::from(self.total_trades)),
            ("Win Rate", self.win_rate),
            ("Average Trade Return", self.avg_trade_return),
            ("Profit Factor", self.profit_factor),
            ("Best Trade", self.best_trade),
            ("Worst Trade", self.worst_trade),
            ("Final Equity", self.final_equity),
            ("Completed Trades", f64::from(self.completed_trades)),
            ("Winning Trades", f64::from(self.winning_trades)),
            ("Losing Trades", f64::from(self.losing_trades)),
            ("Best Round Trip", self.best_round_trip),
            ("Worst Round Trip", self.worst_round_trip),
            ("Max Drawdown Duration", self.max_drawdown_duration as f64),
            ("Exposure", self.exposure),
        ]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

/// Signals produced by a strategy, aligned with the price series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub signals: Vec<Position>,
    pub deltas: Vec<PositionDelta>,
    pub short_ma: Vec<f64>,
    pub long_ma: Vec<f64>,
}

impl SignalFrame {
    /// Attach deltas to a signal series. The first delta is always `Hold`.
    pub fn from_signals(signals: Vec<Position>, short_ma: Vec<f64>, long_ma: Vec<f64>) -> Self {
        let mut deltas = Vec::with_capacity(signals.len());
        let mut previous = None;
        for &signal in &signals {
            deltas.push(match previous {
                Some(prev) => PositionDelta::between(prev, signal),
                None => PositionDelta::Hold,
            });
            previous = Some(signal);
        }

        Self {
            signals,
            deltas,
            short_ma,
            long_ma,
        }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Backtest result
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub parameters: BacktestParameters,
    pub report: PerformanceReport,
    pub prices: PriceSeries,
    pub signals: SignalFrame,
    pub returns: Vec<f64>,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub drawdown_curve: Vec<(DateTime<Utc>, f64)>,
    pub trades: Vec<Trade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_position: Option<OpenPosition>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}
