//! Backtesting of the skew signal.
//!
//! This module provides:
//! - Daily market and strategy returns from signal records
//! - Flat per-trade cost modeling
//! - Compound return curves and running drawdown

pub mod costs;
pub mod engine;

pub use costs::CostModel;
pub use engine::{BacktestConfig, BacktestEngine, BacktestResult, EquityPoint};
