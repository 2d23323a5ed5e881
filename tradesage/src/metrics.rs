use chrono::{DateTime, Utc};
use common::{BacktestParameters, PerformanceReport, SignalFrame, Trade};

/// Calculate performance metrics from returns, equity curve and trades.
///
/// Every ratio with a zero (or undefined) denominator resolves to `f64::NAN`
/// rather than failing. Standard deviations are sample (n - 1) deviations
/// throughout.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all performance metrics
    pub fn calculate(
        returns: &[f64],
        equity_curve: &[(DateTime<Utc>, f64)],
        trades: &[Trade],
        signals: &SignalFrame,
        params: &BacktestParameters,
    ) -> PerformanceReport {
        if equity_curve.is_empty() || returns.is_empty() {
            return PerformanceReport::default();
        }

        let periods_per_year = f64::from(params.periods_per_year);
        let initial_capital = params.initial_capital;
        let final_equity = equity_curve
            .last()
            .map(|(_, e)| *e)
            .unwrap_or(initial_capital);
        let cumulative_return = final_equity / initial_capital - 1.0;

        let annualized_return = mean(returns) * periods_per_year;
        let annualized_volatility = sample_std(returns)
            .map(|std| std * periods_per_year.sqrt())
            .unwrap_or(f64::NAN);

        let excess: Vec<f64> = returns.iter().map(|r| r - params.risk_free_rate).collect();
        let sharpe_ratio = Self::calculate_sharpe_ratio(&excess, periods_per_year);
        let sortino_ratio = Self::calculate_sortino_ratio(&excess, periods_per_year);

        let (max_drawdown, max_drawdown_duration) = Self::calculate_max_drawdown(equity_curve);
        let calmar_ratio = if max_drawdown != 0.0 {
            annualized_return / max_drawdown.abs()
        } else {
            f64::NAN
        };

        let trade_stats = Self::calculate_trade_stats(trades);
        let (best_trade, worst_trade) = Self::period_extremes(returns);

        PerformanceReport {
            cumulative_return,
            annualized_return,
            final_equity,
            annualized_volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            calmar_ratio,
            total_trades: Self::count_position_changes(signals),
            completed_trades: trades.len() as u32,
            winning_trades: trade_stats.winning,
            losing_trades: trade_stats.losing,
            win_rate: trade_stats.win_rate,
            avg_trade_return: trade_stats.avg_return,
            profit_factor: trade_stats.profit_factor,
            best_trade,
            worst_trade,
            best_round_trip: trade_stats.best,
            worst_round_trip: trade_stats.worst,
            exposure: Self::calculate_exposure(signals),
        }
    }

    /// Annualized mean over annualized deviation of excess returns
    fn calculate_sharpe_ratio(excess: &[f64], periods_per_year: f64) -> f64 {
        match sample_std(excess) {
            Some(std) if std > 0.0 => {
                (mean(excess) * periods_per_year) / (std * periods_per_year.sqrt())
            }
            _ => f64::NAN,
        }
    }

    /// Like Sharpe, but the deviation is taken over negative excess returns only
    fn calculate_sortino_ratio(excess: &[f64], periods_per_year: f64) -> f64 {
        let downside: Vec<f64> = excess.iter().copied().filter(|&r| r < 0.0).collect();

        match sample_std(&downside) {
            Some(std) if std > 0.0 => {
                (mean(excess) * periods_per_year) / (std * periods_per_year.sqrt())
            }
            _ => f64::NAN,
        }
    }

    /// Deepest drawdown (<= 0) and the number of periods from its peak to its trough
    fn calculate_max_drawdown(equity_curve: &[(DateTime<Utc>, f64)]) -> (f64, usize) {
        if equity_curve.is_empty() {
            return (0.0, 0);
        }

        let mut max_equity = equity_curve[0].1;
        let mut peak_index = 0;
        let mut max_drawdown = 0.0;
        let mut max_dd_duration = 0;

        for (i, (_, equity)) in equity_curve.iter().enumerate() {
            if *equity > max_equity {
                max_equity = *equity;
                peak_index = i;
            }

            let drawdown = (equity - max_equity) / max_equity;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
                max_dd_duration = i - peak_index;
            }
        }

        (max_drawdown, max_dd_duration)
    }

    /// Calculate drawdown curve as fractions of the running peak (<= 0)
    pub fn calculate_drawdown_curve(
        equity_curve: &[(DateTime<Utc>, f64)],
    ) -> Vec<(DateTime<Utc>, f64)> {
        if equity_curve.is_empty() {
            return vec![];
        }

        let mut max_equity = equity_curve[0].1;
        equity_curve
            .iter()
            .map(|(ts, equity)| {
                if *equity > max_equity {
                    max_equity = *equity;
                }
                let drawdown = if max_equity > 0.0 {
                    (equity - max_equity) / max_equity
                } else {
                    0.0
                };
                (*ts, drawdown)
            })
            .collect()
    }

    /// Entries plus exits. Not the number of completed round trips.
    fn count_position_changes(signals: &SignalFrame) -> u32 {
        signals
            .deltas
            .iter()
            .map(|d| u32::from(d.value().unsigned_abs()))
            .sum()
    }

    /// Largest positive and smallest negative *period* return, 0 when absent
    fn period_extremes(returns: &[f64]) -> (f64, f64) {
        let best = returns
            .iter()
            .copied()
            .filter(|&r| r > 0.0)
            .fold(0.0, f64::max);
        let worst = returns
            .iter()
            .copied()
            .filter(|&r| r < 0.0)
            .fold(0.0, f64::min);
        (best, worst)
    }

    /// Calculate trade statistics over completed round trips
    fn calculate_trade_stats(trades: &[Trade]) -> TradeStats {
        if trades.is_empty() {
            return TradeStats::default();
        }

        let mut winning = 0u32;
        let mut losing = 0u32;
        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        let mut best = f64::MIN;
        let mut worst = f64::MAX;

        for trade in trades {
            let r = trade.return_pct;
            if r > 0.0 {
                winning += 1;
                gross_profit += r;
            } else if r < 0.0 {
                losing += 1;
                gross_loss += r.abs();
            }
            best = best.max(r);
            worst = worst.min(r);
        }

        let n = trades.len() as f64;
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        TradeStats {
            winning,
            losing,
            win_rate: f64::from(winning) / n,
            avg_return: trades.iter().map(|t| t.return_pct).sum::<f64>() / n,
            profit_factor,
            best,
            worst,
        }
    }

    /// Fraction of periods that earned the price return (lagged signal long)
    fn calculate_exposure(signals: &SignalFrame) -> f64 {
        let n = signals.len();
        if n == 0 {
            return 0.0;
        }

        let exposed = signals.signals[..n - 1]
            .iter()
            .filter(|s| s.is_long())
            .count();
        exposed as f64 / n as f64
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    winning: u32,
    losing: u32,
    win_rate: f64,
    avg_return: f64,
    profit_factor: f64,
    best: f64,
    worst: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; `None` with fewer than two values.
///
/// Exactly zero when every value is identical, whatever rounding `mean`
/// picks up on the way.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    if values.iter().all(|&v| v == values[0]) {
        return Some(0.0);
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::TimeZone;
    use common::Position;

    fn make_equity_curve(values: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 12, 0, 0).unwrap(),
                    v,
                )
            })
            .collect()
    }

    fn make_trade(return_pct: f64) -> Trade {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Trade {
            entry_date: date,
            entry_price: 100.0,
            exit_date: date,
            exit_price: 100.0 * (1.0 + return_pct),
            return_pct,
            holding_periods: 1,
        }
    }

    fn flat_frame(n: usize) -> SignalFrame {
        SignalFrame::from_signals(vec![Position::Flat; n], vec![], vec![])
    }

    fn params() -> BacktestParameters {
        BacktestParameters::default().with_capital(10_000.0)
    }

    #[test]
    fn test_basic_metrics() {
        let returns = [0.0, 0.01, 0.02, -0.01];
        let equity = make_equity_curve(&[10000.0, 10100.0, 10302.0, 10198.98]);

        let report = MetricsCalculator::calculate(&returns, &equity, &[], &flat_frame(4), &params());

        assert_relative_eq!(report.cumulative_return, 0.019898, epsilon = 1e-9);
        assert_relative_eq!(report.annualized_return, 0.005 * 252.0, epsilon = 1e-12);
        assert_eq!(report.final_equity, 10198.98);
        assert_eq!(report.best_trade, 0.02);
        assert_eq!(report.worst_trade, -0.01);
    }

    #[test]
    fn test_sample_volatility_and_sharpe() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let equity = make_equity_curve(&[10000.0; 4]);
        let report = MetricsCalculator::calculate(&returns, &equity, &[], &flat_frame(4), &params());

        // mean 0.005, squared deviations sum to 0.0005 over n - 1 = 3
        let std = (0.0005_f64 / 3.0).sqrt();
        assert_relative_eq!(report.annualized_volatility, std * 252.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            report.sharpe_ratio,
            0.005 * 252.0 / (std * 252.0_f64.sqrt()),
            epsilon = 1e-9
        );
        // only one negative return: downside deviation is undefined
        assert!(report.sortino_ratio.is_nan());
    }

    #[test]
    fn test_sortino_uses_downside_only() {
        let returns = [0.03, -0.01, 0.02, -0.03];
        let equity = make_equity_curve(&[10000.0; 4]);
        let report = MetricsCalculator::calculate(&returns, &equity, &[], &flat_frame(4), &params());

        // downside [-0.01, -0.03]: mean -0.02, sample std sqrt(0.0002)
        let downside_std = 0.0002_f64.sqrt();
        assert_relative_eq!(
            report.sortino_ratio,
            0.0025 * 252.0 / (downside_std * 252.0_f64.sqrt()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_risk_free_rate_shifts_sharpe() {
        let returns = [0.01, 0.03, 0.02];
        let equity = make_equity_curve(&[10000.0; 3]);
        let frame = flat_frame(3);

        let base = MetricsCalculator::calculate(&returns, &equity, &[], &frame, &params());
        let with_rf = MetricsCalculator::calculate(
            &returns,
            &equity,
            &[],
            &frame,
            &params().with_risk_free_rate(0.01),
        );
        assert!(with_rf.sharpe_ratio < base.sharpe_ratio);
        // volatility is not affected by a constant shift
        assert_relative_eq!(with_rf.annualized_volatility, base.annualized_volatility);
    }

    #[test]
    fn test_zero_volatility_is_undefined() {
        let returns = [0.0; 5];
        let equity = make_equity_curve(&[10000.0; 5]);
        let report = MetricsCalculator::calculate(&returns, &equity, &[], &flat_frame(5), &params());

        assert!(report.sharpe_ratio.is_nan());
        assert!(report.sortino_ratio.is_nan());
        assert!(report.calmar_ratio.is_nan());
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.annualized_volatility, 0.0);
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.win_rate, 0.0);
    }

    #[test]
    fn test_constant_excess_returns_are_undefined() {
        // every excess return is -rf, but sum / n does not round back to -rf
        for n in [5, 7, 30] {
            for rf in [1e-4, 1e-2] {
                let returns = vec![0.0; n];
                let equity = make_equity_curve(&vec![10000.0; n]);
                let report = MetricsCalculator::calculate(
                    &returns,
                    &equity,
                    &[],
                    &flat_frame(n),
                    &params().with_risk_free_rate(rf),
                );

                assert!(report.sharpe_ratio.is_nan(), "n={n} rf={rf}");
                assert!(report.sortino_ratio.is_nan(), "n={n} rf={rf}");
                assert_eq!(report.annualized_volatility, 0.0);
            }
        }
        assert_eq!(sample_std(&[-1e-4; 7]), Some(0.0));
    }

    #[test]
    fn test_period_extremes_default_to_zero() {
        let returns = [0.0, 0.01, 0.03, 0.02];
        let equity = make_equity_curve(&[10000.0, 10000.0, 10100.0, 10403.0]);
        let report = MetricsCalculator::calculate(&returns, &equity, &[], &flat_frame(4), &params());

        assert_eq!(report.best_trade, 0.03);
        assert_eq!(report.worst_trade, 0.0);
        // no completed round trips
        assert_eq!(report.avg_trade_return, 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let equity = make_equity_curve(&[10000.0, 11000.0, 9000.0, 9500.0, 10500.0]);
        let (max_dd, duration) = MetricsCalculator::calculate_max_drawdown(&equity);

        // Peak was 11000, trough was 9000
        assert_relative_eq!(max_dd, -2000.0 / 11000.0);
        assert_eq!(duration, 1);
    }

    #[test]
    fn test_max_drawdown_non_decreasing_is_zero() {
        let equity = make_equity_curve(&[100.0, 100.0, 101.0, 105.0]);
        let (max_dd, duration) = MetricsCalculator::calculate_max_drawdown(&equity);
        assert_eq!(max_dd, 0.0);
        assert_eq!(duration, 0);
    }

    #[test]
    fn test_drawdown_curve() {
        let equity = make_equity_curve(&[10000.0, 11000.0, 10000.0, 9000.0]);
        let dd_curve = MetricsCalculator::calculate_drawdown_curve(&equity);

        assert_eq!(dd_curve.len(), 4);
        assert_eq!(dd_curve[0].1, 0.0); // No drawdown at start
        assert_eq!(dd_curve[1].1, 0.0); // New high, no drawdown
        assert_abs_diff_eq!(dd_curve[2].1, -0.0909, epsilon = 1e-4);
        assert_abs_diff_eq!(dd_curve[3].1, -0.1818, epsilon = 1e-4);
    }

    #[test]
    fn test_trade_stats() {
        let trades = [make_trade(0.10), make_trade(-0.05), make_trade(0.05), make_trade(0.0)];
        let stats = MetricsCalculator::calculate_trade_stats(&trades);

        assert_eq!(stats.winning, 2);
        assert_eq!(stats.losing, 1);
        assert_relative_eq!(stats.win_rate, 0.5);
        assert_relative_eq!(stats.avg_return, 0.025, epsilon = 1e-12);
        assert_relative_eq!(stats.profit_factor, 3.0, epsilon = 1e-12);
        assert_eq!(stats.best, 0.10);
        assert_eq!(stats.worst, -0.05);
    }

    #[test]
    fn test_profit_factor_without_losses_is_infinite() {
        let stats = MetricsCalculator::calculate_trade_stats(&[make_trade(0.02)]);
        assert_eq!(stats.profit_factor, f64::INFINITY);

        let stats = MetricsCalculator::calculate_trade_stats(&[make_trade(-0.02)]);
        assert_eq!(stats.profit_factor, 0.0);
    }

    #[test]
    fn test_total_trades_counts_entries_and_exits() {
        use common::Position::{Flat, Long};
        let frame = SignalFrame::from_signals(vec![Flat, Long, Flat, Long, Long], vec![], vec![]);
        assert_eq!(MetricsCalculator::count_position_changes(&frame), 3);
        // lagged long at periods 2 and 4
        assert_relative_eq!(MetricsCalculator::calculate_exposure(&frame), 0.4);
    }
}
