//! Run diagnostics.
//!
//! This module reports, without gating the run:
//! - Rows dropped by DTE filtering and numeric coercion
//! - Strike increment and grid exactness
//! - ATM IV and skew coverage
//! - Skew distribution statistics

pub mod coverage;

pub use coverage::{CheckResult, CoverageReport, SkewDistribution};
