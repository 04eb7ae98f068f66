//! Performance metrics module.
//!
//! Provides:
//! - Strategy, market and excess return
//! - Sharpe ratio over active days
//! - Maximum drawdown

pub mod calculator;

pub use calculator::{MetricsCalculator, PerformanceMetrics};
