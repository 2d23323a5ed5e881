use chrono::{DateTime, Utc};
use common::{BacktestParameters, BacktestResult, PriceSeries, Result};
use tracing::{debug, info, warn};

use crate::metrics::MetricsCalculator;
use crate::returns::{compute_equity, compute_returns};
use crate::signals::{MovingAverageCrossover, Strategy};
use crate::trades::extract_trades;

/// Single-instrument backtest engine
///
/// Holds a validated configuration only; every run works on its own inputs,
/// so one engine can be shared across threads.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    params: BacktestParameters,
}

impl BacktestEngine {
    /// Fails if the configuration is invalid, before any data is seen.
    pub fn new(params: BacktestParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The crossover strategy described by the configured windows
    pub fn default_strategy(&self) -> Result<MovingAverageCrossover> {
        MovingAverageCrossover::from_params(&self.params)
    }

    /// Run the configured moving average crossover
    pub fn run_crossover(&self, prices: &PriceSeries) -> Result<BacktestResult> {
        let strategy = self.default_strategy()?;
        self.run(prices, &strategy)
    }

    /// Run backtest on provided price data
    pub fn run(&self, prices: &PriceSeries, strategy: &dyn Strategy) -> Result<BacktestResult> {
        let name = strategy.name();

        let signals = strategy.generate_signals(prices)?;
        debug!(
            strategy = %name,
            periods = prices.len(),
            warmup = strategy.warmup_periods(),
            long_periods = signals.signals.iter().filter(|s| s.is_long()).count(),
            "signals generated"
        );

        let returns = compute_returns(prices, &signals.signals)?;
        let equity = compute_equity(&returns, self.params.initial_capital)?;

        let trade_log = extract_trades(prices, &signals.deltas)?;
        debug!(trades = trade_log.trades.len(), "round trips extracted");
        if let Some(open) = &trade_log.open_position {
            warn!(
                entry_date = %open.entry_date.date_naive(),
                entry_price = open.entry_price,
                "position still open at end of series, excluded from trade statistics"
            );
        }

        let equity_curve: Vec<(DateTime<Utc>, f64)> = prices
            .points()
            .iter()
            .map(|p| p.timestamp)
            .zip(equity)
            .collect();

        let report = MetricsCalculator::calculate(
            &returns,
            &equity_curve,
            &trade_log.trades,
            &signals,
            &self.params,
        );
        let drawdown_curve = MetricsCalculator::calculate_drawdown_curve(&equity_curve);

        info!(
            strategy = %name,
            cumulative_return = report.cumulative_return,
            max_drawdown = report.max_drawdown,
            total_trades = report.total_trades,
            "backtest complete"
        );

        Ok(BacktestResult {
            strategy: name,
            parameters: self.params.clone(),
            report,
            prices: prices.clone(),
            signals,
            returns,
            equity_curve,
            drawdown_curve,
            trades: trade_log.trades,
            open_position: trade_log.open_position,
            start_date: prices.first().timestamp.date_naive(),
            end_date: prices.last().timestamp.date_naive(),
            initial_capital: self.params.initial_capital,
        })
    }
}
