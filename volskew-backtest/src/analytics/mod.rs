//! Skew analytics.
//!
//! Provides:
//! - DTE window and numeric coercion of raw quotes
//! - Contract normalization (wide rows into option legs)
//! - Strike grid construction and increment detection
//! - ATM/OTM volatility and skew resolution

pub mod normalizer;
pub mod quotes;
pub mod skew_resolver;
pub mod strike_grid;

pub use normalizer::normalize;
pub use quotes::{filter_quotes, FilterStats, FilteredQuote};
pub use skew_resolver::{coverage_ratio, volatility_skew, OptionIndex, SkewResolver};
pub use strike_grid::{assign_strikes, build_grid, detect_strike_increment, strike_grid};
