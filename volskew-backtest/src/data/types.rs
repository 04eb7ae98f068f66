//! Core data types for the skew pipeline.
//!
//! Each stage of the pipeline produces a new table of one of these types:
//! raw quote rows become option records and grid points, grid points are
//! resolved into skew records, and skew records collapse into one signal
//! record per trading date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

/// One exchange quote line, call and put fields side by side.
///
/// Numeric cells are `None` when they were empty or failed to parse.
/// Coercion decisions (dropping the row or the leg) belong to the
/// downstream stages, not to ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuoteRow {
    /// Quote (trade) date
    pub quote_date: NaiveDate,

    /// Option expiration date
    pub expiry: NaiveDate,

    /// Days to expiration as reported by the vendor
    pub dte: Option<f64>,

    /// Underlying last price
    pub underlying_last: Option<f64>,

    /// Strike price
    pub strike: Option<Decimal>,

    /// Call implied volatility
    pub call_iv: Option<f64>,

    /// Put implied volatility
    pub put_iv: Option<f64>,

    /// Call last traded price
    pub call_last: Option<f64>,

    /// Put last traded price
    pub put_last: Option<f64>,
}

/// A single option leg with a positive last traded price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub date: NaiveDate,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub option_type: OptionType,
    pub last_price: f64,
}

/// ATM and OTM strikes for one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeGrid {
    pub atm: Decimal,
    pub otm_call: Decimal,
    pub otm_put: Decimal,
}

/// Synthetic underlying record for one (date, expiry) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub date: NaiveDate,
    pub expiry: NaiveDate,

    /// First underlying price observed for the key
    pub underlying_close: f64,

    /// First DTE observed for the key
    pub days_to_expiry: f64,

    /// Mean call IV across the key's rows (diagnostic only)
    pub call_iv_mean: f64,

    /// Mean put IV across the key's rows (diagnostic only)
    pub put_iv_mean: f64,

    /// Strike grid; `None` when no strike increment could be established
    pub strikes: Option<StrikeGrid>,
}

impl GridPoint {
    pub fn atm_strike(&self) -> Option<Decimal> {
        self.strikes.map(|s| s.atm)
    }

    pub fn otm_call_strike(&self) -> Option<Decimal> {
        self.strikes.map(|s| s.otm_call)
    }

    pub fn otm_put_strike(&self) -> Option<Decimal> {
        self.strikes.map(|s| s.otm_put)
    }
}

/// Grid point with resolved volatilities and skew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewRecord {
    pub point: GridPoint,
    pub atm_iv: Option<f64>,
    pub otm_call_iv: Option<f64>,
    pub otm_put_iv: Option<f64>,

    /// (otm_put_iv - otm_call_iv) / atm_iv
    pub volatility_skew: Option<f64>,
}

impl SkewRecord {
    pub fn date(&self) -> NaiveDate {
        self.point.date
    }

    pub fn expiry(&self) -> NaiveDate {
        self.point.expiry
    }

    pub fn days_to_expiry(&self) -> f64 {
        self.point.days_to_expiry
    }

    pub fn has_coverage(&self) -> bool {
        self.atm_iv.is_some()
    }
}

/// Signal and carried position for one trading date.
///
/// `signal` and `position` take values in {-1, 0, +1}: -1 fires when skew
/// is below the lower threshold, +1 when it is above the upper threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub date: NaiveDate,
    pub expiry: NaiveDate,
    pub days_to_expiry: f64,
    pub underlying_close: f64,
    pub skew: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub signal: i8,
    pub position: i8,
}

impl SignalRecord {
    pub fn is_expiry_day(&self) -> bool {
        self.date == self.expiry
    }
}
