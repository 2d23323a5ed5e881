pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod returns;
pub mod signals;
pub mod trades;

pub use data::{generate_synthetic_prices, load_file};
pub use engine::BacktestEngine;
pub use metrics::MetricsCalculator;
pub use returns::{compute_equity, compute_returns};
pub use signals::{MovingAverageCrossover, Strategy};
pub use trades::{extract_trades, TradeLog};

// Re-export common types
pub use common::{
    BacktestError, BacktestParameters, BacktestResult, MovingAverage, OpenPosition,
    PerformanceReport, Position, PositionDelta, PricePoint, PriceSeries, Result, SignalFrame,
    Trade,
};
