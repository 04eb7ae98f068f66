//! DTE window and numeric coercion shared by the normalizer and grid builder.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DteBounds;
use crate::data::RawQuoteRow;

/// Quote row that passed the DTE window and has numeric IVs and underlying.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredQuote {
    pub quote_date: NaiveDate,
    pub expiry: NaiveDate,
    pub dte: f64,
    pub underlying_last: f64,
    pub strike: Option<Decimal>,
    pub call_iv: f64,
    pub put_iv: f64,
    pub call_last: Option<f64>,
    pub put_last: Option<f64>,
}

/// Row counts from one filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub rows_seen: usize,
    pub out_of_range: usize,
    pub unparseable: usize,
    pub kept: usize,
}

/// Keep rows inside the DTE window whose IVs and underlying are numeric.
///
/// A row whose DTE cannot be parsed cannot be placed in the window and is
/// counted as unparseable.
pub fn filter_quotes(rows: &[RawQuoteRow], bounds: &DteBounds) -> (Vec<FilteredQuote>, FilterStats) {
    let mut stats = FilterStats {
        rows_seen: rows.len(),
        ..Default::default()
    };
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(dte) = row.dte else {
            stats.unparseable += 1;
            continue;
        };
        if !bounds.contains(dte) {
            stats.out_of_range += 1;
            continue;
        }

        match (row.call_iv, row.put_iv, row.underlying_last) {
            (Some(call_iv), Some(put_iv), Some(underlying_last)) => kept.push(FilteredQuote {
                quote_date: row.quote_date,
                expiry: row.expiry,
                dte,
                underlying_last,
                strike: row.strike,
                call_iv,
                put_iv,
                call_last: row.call_last,
                put_last: row.put_last,
            }),
            _ => stats.unparseable += 1,
        }
    }

    stats.kept = kept.len();
    debug!(
        "Quote filter: {} seen, {} out of DTE range, {} unparseable, {} kept",
        stats.rows_seen, stats.out_of_range, stats.unparseable, stats.kept
    );

    (kept, stats)
}


#[cfg(test)]
mod tests {
    use super::fixtures::raw_row;
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, d).unwrap()
    }

    #[test]
    fn test_dte_window_is_inclusive() {
        let rows = vec![
            raw_row(day(2), day(12), 10.0, dec!(4000)),
            raw_row(day(2), day(11), 9.0, dec!(4000)),
            raw_row(day(2), day(30), 180.0, dec!(4000)),
            raw_row(day(2), day(31), 181.0, dec!(4000)),
        ];

        let (kept, stats) = filter_quotes(&rows, &DteBounds::default());
        assert_eq!(kept.len(), 2);
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(kept[0].dte, 10.0);
        assert_eq!(kept[1].dte, 180.0);
    }

    #[test]
    fn test_unparseable_fields_drop_row() {
        let mut missing_iv = raw_row(day(2), day(20), 18.0, dec!(4000));
        missing_iv.put_iv = None;
        let mut missing_underlying = raw_row(day(2), day(20), 18.0, dec!(4005));
        missing_underlying.underlying_last = None;
        let mut missing_dte = raw_row(day(2), day(20), 18.0, dec!(4010));
        missing_dte.dte = None;
        let good = raw_row(day(2), day(20), 18.0, dec!(4015));

        let (kept, stats) = filter_quotes(
            &[missing_iv, missing_underlying, missing_dte, good],
            &DteBounds::default(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].strike, Some(dec!(4015)));
        assert_eq!(stats.unparseable, 3);
        assert_eq!(stats.rows_seen, 4);
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_missing_last_price_is_not_filtered_here() {
        let mut row = raw_row(day(2), day(20), 18.0, dec!(4000));
        row.call_last = None;
        let (kept, _) = filter_quotes(&[row], &DteBounds::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].call_last, None);
    }
}
