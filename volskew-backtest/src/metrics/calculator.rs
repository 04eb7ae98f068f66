//! Performance metrics calculator.
//!
//! Calculates strategy performance statistics from a backtest result.

use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestResult, EquityPoint};

/// Summary performance statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Return metrics
    pub total_return_pct: f64,
    pub market_return_pct: f64,
    pub alpha_pct: f64,

    // Risk metrics
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,

    // Activity
    pub trades: usize,
    pub trading_days: usize,
    pub total_cost_pct: f64,
}

impl PerformanceMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Performance Summary\n\
             ====================\n\
             \n\
             Strategy Total Return: {:>10.2}%\n\
             Market Total Return:   {:>10.2}%\n\
             Alpha:                 {:>10.2}%\n\
             Sharpe Ratio:          {:>10.4}\n\
             Max Drawdown:          {:>10.2}%\n\
             Trades:                {:>10}\n\
             Trading Days:          {:>10}\n\
             Costs:                 {:>10.3}%",
            self.total_return_pct,
            self.market_return_pct,
            self.alpha_pct,
            self.sharpe_ratio,
            self.max_drawdown_pct,
            self.trades,
            self.trading_days,
            self.total_cost_pct,
        )
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics from a backtest result.
    pub fn calculate(result: &BacktestResult) -> PerformanceMetrics {
        let returns = result.strategy_returns();
        let total_return_pct = result.total_return_pct();
        let market_return_pct = result.market_return_pct();

        PerformanceMetrics {
            total_return_pct,
            market_return_pct,
            alpha_pct: total_return_pct - market_return_pct,
            sharpe_ratio: Self::sharpe_ratio(&returns),
            max_drawdown_pct: Self::max_drawdown_pct(&result.equity_curve),
            trades: returns.iter().filter(|r| **r != 0.0).count(),
            trading_days: result.trading_days(),
            total_cost_pct: result.equity_curve.iter().map(|p| p.trade_cost).sum::<f64>() * 100.0,
        }
    }

    /// Annualized Sharpe ratio over the non-zero returns (risk-free = 0).
    ///
    /// Uses the sample standard deviation. Returns 0 with fewer than two
    /// non-zero returns or no dispersion.
    pub fn sharpe_ratio(returns: &[f64]) -> f64 {
        let active: Vec<f64> = returns.iter().copied().filter(|r| *r != 0.0).collect();
        if active.len() < 2 {
            return 0.0;
        }

        let n = active.len() as f64;
        let mean = active.iter().sum::<f64>() / n;
        let variance = active.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return 0.0;
        }

        // Annualize: 252 trading days
        mean / std_dev * 252.0_f64.sqrt()
    }

    /// Deepest drawdown of the strategy curve, in percent (<= 0).
    pub fn max_drawdown_pct(equity_curve: &[EquityPoint]) -> f64 {
        equity_curve
            .iter()
            .map(|p| p.drawdown_pct)
            .fold(0.0, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{BacktestConfig, BacktestEngine};
    use crate::data::SignalRecord;
    use chrono::NaiveDate;

    #[test]
    fn test_sharpe_ratio() {
        let sharpe = MetricsCalculator::sharpe_ratio(&[0.01, 0.0, -0.01, 0.02]);
        assert!((sharpe - 6.928203).abs() < 1e-5);
    }

    #[test]
    fn test_sharpe_ratio_degenerate() {
        assert_eq!(MetricsCalculator::sharpe_ratio(&[]), 0.0);
        assert_eq!(MetricsCalculator::sharpe_ratio(&[0.01, 0.0]), 0.0);
        assert_eq!(MetricsCalculator::sharpe_ratio(&[0.01, 0.01]), 0.0);
    }

    #[test]
    fn test_performance_metrics_default() {
        let metrics = PerformanceMetrics::default();
        assert_eq!(metrics.trades, 0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_drawdown_empty() {
        assert_eq!(MetricsCalculator::max_drawdown_pct(&[]), 0.0);
    }

    #[test]
    fn test_calculate_from_backtest() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let signals: Vec<SignalRecord> = [(100.0, 1), (110.0, 1), (99.0, 1), (120.0, 0)]
            .iter()
            .enumerate()
            .map(|(i, &(close, signal))| {
                let date = start + chrono::Duration::days(i as i64);
                SignalRecord {
                    date,
                    expiry: date + chrono::Duration::days(30),
                    days_to_expiry: 30.0,
                    underlying_close: close,
                    skew: None,
                    lower_bound: None,
                    upper_bound: None,
                    signal,
                    position: 1,
                }
            })
            .collect();

        let result = BacktestEngine::new(BacktestConfig::default()).run(&signals);
        let metrics = MetricsCalculator::calculate(&result);

        assert_eq!(metrics.trading_days, 4);
        assert_eq!(metrics.trades, 2);
        assert!((metrics.max_drawdown_pct + 10.0).abs() < 1e-9);
        assert!((metrics.total_return_pct + 1.0).abs() < 1e-9);
        assert!((metrics.market_return_pct - 20.0).abs() < 1e-9);
        assert!((metrics.alpha_pct + 21.0).abs() < 1e-9);
        assert!(metrics.summary().contains("Sharpe Ratio"));
    }
}
