//! Signal engine.
//!
//! Turns the per-(date, expiry) skew table into one signal per date:
//! 1. Keep the expiry whose DTE is closest to the target tenor
//! 2. Derive lower/upper bounds (static or rolling percentile)
//! 3. Emit -1/0/+1 and force 0 on a row's own expiry date
//! 4. Carry the position forward until the next non-zero signal

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{SignalRecord, SkewRecord};

use super::threshold::{bounds_series, combine, ThresholdMode};

/// Signal generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Tenor used to pick one expiry per date.
    pub target_dte: f64,

    /// Threshold mode.
    pub thresholds: ThresholdMode,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            target_dte: 30.0,
            thresholds: ThresholdMode::default(),
        }
    }
}

/// Signal counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub dates: usize,
    /// Dates with signal -1.
    pub long_signals: usize,
    /// Dates with signal +1.
    pub short_signals: usize,
    pub flat: usize,
    pub mean_dte: f64,
}

impl SignalSummary {
    pub fn from_records(records: &[SignalRecord]) -> Self {
        let dates = records.len();
        let mean_dte = if dates > 0 {
            records.iter().map(|r| r.days_to_expiry).sum::<f64>() / dates as f64
        } else {
            0.0
        };

        Self {
            dates,
            long_signals: records.iter().filter(|r| r.signal < 0).count(),
            short_signals: records.iter().filter(|r| r.signal > 0).count(),
            flat: records.iter().filter(|r| r.signal == 0).count(),
            mean_dte,
        }
    }
}

/// Keep, for each date, the row whose DTE is closest to `target_dte`.
///
/// Ties keep the earlier row. The row is kept whole: a missing skew on the
/// nearest expiry stays missing. Output is ascending by date.
pub fn select_expiries(records: &[SkewRecord], target_dte: f64) -> Vec<&SkewRecord> {
    let distance = |r: &SkewRecord| (r.days_to_expiry() - target_dte).abs();
    let mut selected: BTreeMap<NaiveDate, &SkewRecord> = BTreeMap::new();

    for record in records {
        match selected.get(&record.date()) {
            Some(current) if distance(current) <= distance(record) => {}
            _ => {
                selected.insert(record.date(), record);
            }
        }
    }

    selected.into_values().collect()
}

/// Position series: a non-zero signal sets the position, zero keeps the
/// previous one. A flagged expiry day flattens to 0.
pub fn carry_positions(signals: &[i8], expiry_days: &[bool]) -> Vec<i8> {
    let mut position = 0i8;
    signals
        .iter()
        .enumerate()
        .map(|(i, &signal)| {
            if expiry_days.get(i).copied().unwrap_or(false) {
                position = 0;
            } else if signal != 0 {
                position = signal;
            }
            position
        })
        .collect()
}

/// Generates signal records from skew records.
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, records: &[SkewRecord]) -> Vec<SignalRecord> {
        let selected = select_expiries(records, self.config.target_dte);
        let skews: Vec<Option<f64>> = selected.iter().map(|r| r.volatility_skew).collect();
        let bounds = bounds_series(&skews, &self.config.thresholds);
        let expiry_days: Vec<bool> = selected.iter().map(|r| r.date() == r.expiry()).collect();

        let signals: Vec<i8> = skews
            .iter()
            .zip(&bounds)
            .zip(&expiry_days)
            .map(|((&skew, &b), &expiry_day)| if expiry_day { 0 } else { combine(skew, b) })
            .collect();
        let positions = carry_positions(&signals, &expiry_days);

        let out: Vec<SignalRecord> = selected
            .iter()
            .enumerate()
            .map(|(i, r)| SignalRecord {
                date: r.date(),
                expiry: r.expiry(),
                days_to_expiry: r.days_to_expiry(),
                underlying_close: r.point.underlying_close,
                skew: skews[i],
                lower_bound: bounds[i].lower,
                upper_bound: bounds[i].upper,
                signal: signals[i],
                position: positions[i],
            })
            .collect();

        let summary = SignalSummary::from_records(&out);
        info!(
            "Signals over {} dates: {} at -1, {} at +1, {} flat, mean DTE {:.1}",
            summary.dates, summary.long_signals, summary.short_signals, summary.flat, summary.mean_dte
        );

        out
    }
}
