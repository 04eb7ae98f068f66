//! Skew strategy backtest.
//!
//! Walks the signal table once:
//! 1. Market return from consecutive underlying closes
//! 2. Strategy return = market return * exposure - trade cost
//! 3. Compound market and strategy curves
//! 4. Running drawdown of the strategy curve
//!
//! Exposure is the date's signal by default; `use_position` switches it to
//! the carried position. The first date has no prior close and contributes
//! a zero return.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::SignalRecord;

use super::costs::CostModel;

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Run the backtest after signal generation.
    pub enabled: bool,

    /// Charge trading costs on dates with a non-zero signal.
    pub apply_costs: bool,

    /// Trade the carried position instead of the raw signal.
    pub use_position: bool,

    /// Cost model.
    pub costs: CostModel,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            apply_costs: false,
            use_position: false,
            costs: CostModel::default(),
        }
    }
}

/// Daily backtest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub exposure: i8,
    pub market_return: f64,
    pub trade_cost: f64,
    pub strategy_return: f64,
    pub compound_market: f64,
    pub compound_strategy: f64,
    pub drawdown_pct: f64,
}

/// Result of a completed backtest.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Configuration used.
    pub config: BacktestConfig,

    /// Daily curve, one point per signal record.
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.equity_curve.first().map(|p| p.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.equity_curve.last().map(|p| p.date)
    }

    pub fn trading_days(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn strategy_returns(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.strategy_return).collect()
    }

    /// Strategy return over the whole run, in percent.
    pub fn total_return_pct(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(0.0, |p| (p.compound_strategy - 1.0) * 100.0)
    }

    /// Buy-and-hold return over the whole run, in percent.
    pub fn market_return_pct(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(0.0, |p| (p.compound_market - 1.0) * 100.0)
    }
}

/// The skew strategy backtester.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, signals: &[SignalRecord]) -> BacktestResult {
        let cost_fraction = if self.config.apply_costs {
            self.config.costs.cost_fraction()
        } else {
            0.0
        };

        let mut equity_curve = Vec::with_capacity(signals.len());
        let mut prev_close: Option<f64> = None;
        let mut compound_market = 1.0;
        let mut compound_strategy = 1.0;
        let mut peak = f64::NEG_INFINITY;

        for record in signals {
            let exposure = if self.config.use_position {
                record.position
            } else {
                record.signal
            };

            let market_return = prev_close
                .map(|prev| record.underlying_close / prev - 1.0)
                .filter(|r| r.is_finite());

            let (market_return, trade_cost, strategy_return) = match market_return {
                Some(mr) => {
                    let cost = if record.signal != 0 { cost_fraction } else { 0.0 };
                    let sr = mr * f64::from(exposure) - cost;
                    (mr, cost, if sr.is_finite() { sr } else { 0.0 })
                }
                None => (0.0, 0.0, 0.0),
            };

            compound_market *= 1.0 + market_return;
            compound_strategy *= 1.0 + strategy_return;
            peak = peak.max(compound_strategy);
            let drawdown_pct = if peak > 0.0 {
                (compound_strategy - peak) / peak * 100.0
            } else {
                0.0
            };

            equity_curve.push(EquityPoint {
                date: record.date,
                close: record.underlying_close,
                exposure,
                market_return,
                trade_cost,
                strategy_return,
                compound_market,
                compound_strategy,
                drawdown_pct,
            });

            prev_close = Some(record.underlying_close);
        }

        let result = BacktestResult {
            config: self.config.clone(),
            equity_curve,
        };

        info!(
            "Backtest over {} dates: strategy {:.2}%, market {:.2}%",
            result.trading_days(),
            result.total_return_pct(),
            result.market_return_pct()
        );

        result
    }
}
