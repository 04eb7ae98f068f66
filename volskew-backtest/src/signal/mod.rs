//! Signal generation.
//!
//! Provides:
//! - Static and rolling-percentile skew thresholds
//! - Target-tenor expiry selection
//! - Discrete signals with expiry-day override and position carry-forward

pub mod engine;
pub mod threshold;

pub use engine::{carry_positions, select_expiries, SignalConfig, SignalEngine, SignalSummary};
pub use threshold::{bounds_series, combine, rolling_quantile, Bounds, ThresholdMode};
