//! Grid builder.
//!
//! Aggregates quote rows into one synthetic underlying record per
//! (date, expiry) and assigns the ATM/OTM strike grid:
//! - ATM: increment * round(close / increment), ties to even
//! - OTM call: ATM + 2 * increment
//! - OTM put: ATM - 2 * increment
//!
//! The strike increment is detected once, from the strikes quoted on the
//! first option record's date, and applied to every grid point. A dataset
//! that mixes tick regimes (e.g. 5-point and 25-point strikes) will have
//! grid strikes that were never quoted on some dates; those legs resolve
//! as missing rather than snapping to the nearest strike.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::data::{GridPoint, OptionRecord, StrikeGrid};

use super::quotes::FilteredQuote;

struct GroupAccumulator {
    first_close: f64,
    first_dte: f64,
    call_iv_sum: f64,
    put_iv_sum: f64,
    rows: usize,
}

/// Group quotes by (date, expiry), ascending, without strikes assigned.
pub fn build_grid(quotes: &[FilteredQuote]) -> Vec<GridPoint> {
    let mut groups: BTreeMap<(NaiveDate, NaiveDate), GroupAccumulator> = BTreeMap::new();

    for quote in quotes {
        let group = groups
            .entry((quote.quote_date, quote.expiry))
            .or_insert_with(|| GroupAccumulator {
                first_close: quote.underlying_last,
                first_dte: quote.dte,
                call_iv_sum: 0.0,
                put_iv_sum: 0.0,
                rows: 0,
            });
        group.call_iv_sum += quote.call_iv;
        group.put_iv_sum += quote.put_iv;
        group.rows += 1;
    }

    groups
        .into_iter()
        .map(|((date, expiry), group)| GridPoint {
            date,
            expiry,
            underlying_close: group.first_close,
            days_to_expiry: group.first_dte,
            call_iv_mean: group.call_iv_sum / group.rows as f64,
            put_iv_mean: group.put_iv_sum / group.rows as f64,
            strikes: None,
        })
        .collect()
}

/// Most common gap between consecutive distinct strikes on the first
/// record's date. Ties go to the gap seen first in ascending strike order.
///
/// Returns `None` when that date has fewer than two distinct strikes.
pub fn detect_strike_increment(records: &[OptionRecord]) -> Option<Decimal> {
    let sample_date = records.first()?.date;
    let strikes: BTreeSet<Decimal> = records
        .iter()
        .filter(|r| r.date == sample_date)
        .map(|r| r.strike.normalize())
        .collect();

    most_common_difference(&strikes.into_iter().collect::<Vec<_>>())
}

/// Most common consecutive difference of an ascending strike list.
pub fn most_common_difference(strikes: &[Decimal]) -> Option<Decimal> {
    // (difference, count) in first-seen order
    let mut counts: Vec<(Decimal, usize)> = Vec::new();

    for pair in strikes.windows(2) {
        let diff = (pair[1] - pair[0]).normalize();
        match counts.iter_mut().find(|(d, _)| *d == diff) {
            Some((_, count)) => *count += 1,
            None => counts.push((diff, 1)),
        }
    }

    let mut best: Option<(Decimal, usize)> = None;
    for (diff, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((diff, count));
        }
    }
    best.map(|(diff, _)| diff)
}

/// Strike grid around an underlying price.
pub fn strike_grid(close: f64, increment: Decimal) -> Option<StrikeGrid> {
    if increment <= Decimal::ZERO {
        return None;
    }

    let close = Decimal::from_f64_retain(close)?;
    let atm = close
        .checked_div(increment)?
        .round()
        .checked_mul(increment)?
        .normalize();
    let offset = increment * Decimal::from(2);

    Some(StrikeGrid {
        atm,
        otm_call: (atm + offset).normalize(),
        otm_put: (atm - offset).normalize(),
    })
}

/// Attach strikes to every grid point. With no increment the points are
/// returned unchanged, strikes unset.
pub fn assign_strikes(points: Vec<GridPoint>, increment: Option<Decimal>) -> Vec<GridPoint> {
    points
        .into_iter()
        .map(|point| GridPoint {
            strikes: increment.and_then(|inc| strike_grid(point.underlying_close, inc)),
            ..point
        })
        .collect()
}
