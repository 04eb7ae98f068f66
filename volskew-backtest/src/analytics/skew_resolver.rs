//! Skew resolver.
//!
//! Joins grid points with option legs and derives the volatility skew:
//!
//! ```text
//! skew = (otm_put_iv - otm_call_iv) / atm_iv
//! ```
//!
//! Volatility here is the leg's last traded price; no pricing model is
//! involved. Positive skew (puts richer than calls) reads bearish for the
//! underlying, negative skew bullish.
//!
//! Sparse coverage never fails: a leg that was not quoted at the exact grid
//! strike is simply missing, and the skew is missing with it.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::data::{GridPoint, OptionRecord, OptionType, SkewRecord};

type LegKey = (NaiveDate, NaiveDate, Decimal, OptionType);

/// Last price per (date, expiry, strike, option type), first record wins.
#[derive(Debug, Default)]
pub struct OptionIndex {
    prices: HashMap<LegKey, f64>,
}

impl OptionIndex {
    pub fn build(records: &[OptionRecord]) -> Self {
        let mut prices = HashMap::with_capacity(records.len());
        for record in records {
            prices
                .entry((
                    record.date,
                    record.expiry,
                    record.strike.normalize(),
                    record.option_type,
                ))
                .or_insert(record.last_price);
        }
        Self { prices }
    }

    pub fn price(
        &self,
        date: NaiveDate,
        expiry: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
    ) -> Option<f64> {
        self.prices
            .get(&(date, expiry, strike.normalize(), option_type))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Skew ratio, or `None` when any input is missing or ATM is zero.
pub fn volatility_skew(atm_iv: Option<f64>, otm_call_iv: Option<f64>, otm_put_iv: Option<f64>) -> Option<f64> {
    let (atm, call, put) = (atm_iv?, otm_call_iv?, otm_put_iv?);
    if atm == 0.0 {
        return None;
    }
    let skew = (put - call) / atm;
    skew.is_finite().then_some(skew)
}

/// Resolves ATM/OTM volatilities for grid points.
pub struct SkewResolver {
    index: OptionIndex,
}

impl SkewResolver {
    pub fn new(records: &[OptionRecord]) -> Self {
        Self {
            index: OptionIndex::build(records),
        }
    }

    /// One skew record per grid point, in input order.
    pub fn resolve(&self, points: &[GridPoint]) -> Vec<SkewRecord> {
        if self.index.is_empty() && !points.is_empty() {
            warn!("No option legs to resolve {} grid points against", points.len());
        }

        let records: Vec<SkewRecord> = points.iter().map(|p| self.resolve_point(p)).collect();

        let covered = records.iter().filter(|r| r.has_coverage()).count();
        info!(
            "IV resolved: {}/{} grid points with ATM IV ({:.1}%) from {} legs",
            covered,
            records.len(),
            coverage_ratio(&records) * 100.0,
            self.index.len()
        );

        records
    }

    fn resolve_point(&self, point: &GridPoint) -> SkewRecord {
        let Some(strikes) = point.strikes else {
            return SkewRecord {
                point: point.clone(),
                atm_iv: None,
                otm_call_iv: None,
                otm_put_iv: None,
                volatility_skew: None,
            };
        };

        let leg = |strike, option_type| self.index.price(point.date, point.expiry, strike, option_type);

        let atm_iv = match (leg(strikes.atm, OptionType::Call), leg(strikes.atm, OptionType::Put)) {
            (Some(call), Some(put)) => Some((call + put) / 2.0),
            _ => None,
        };
        let otm_call_iv = leg(strikes.otm_call, OptionType::Call);
        let otm_put_iv = leg(strikes.otm_put, OptionType::Put);

        SkewRecord {
            point: point.clone(),
            atm_iv,
            otm_call_iv,
            otm_put_iv,
            volatility_skew: volatility_skew(atm_iv, otm_call_iv, otm_put_iv),
        }
    }
}

/// Share of records with an ATM volatility; 0 for an empty table.
pub fn coverage_ratio(records: &[SkewRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().filter(|r| r.has_coverage()).count() as f64 / records.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StrikeGrid;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, d).unwrap()
    }

    fn point(date: NaiveDate) -> GridPoint {
        GridPoint {
            date,
            expiry: day(31),
            underlying_close: 4288.0,
            days_to_expiry: 29.0,
            call_iv_mean: 0.15,
            put_iv_mean: 0.18,
            strikes: Some(StrikeGrid {
                atm: dec!(4290),
                otm_call: dec!(4300),
                otm_put: dec!(4280),
            }),
        }
    }

    fn leg(date: NaiveDate, strike: Decimal, option_type: OptionType, price: f64) -> OptionRecord {
        OptionRecord {
            date,
            expiry: day(31),
            strike,
            option_type,
            last_price: price,
        }
    }

    fn full_chain(date: NaiveDate) -> Vec<OptionRecord> {
        vec![
            leg(date, dec!(4290), OptionType::Call, 19.0),
            leg(date, dec!(4290), OptionType::Put, 21.0),
            leg(date, dec!(4300), OptionType::Call, 18.0),
            leg(date, dec!(4280), OptionType::Put, 24.0),
        ]
    }

    #[test]
    fn test_volatility_skew_formula() {
        let skew = volatility_skew(Some(20.0), Some(18.0), Some(24.0)).unwrap();
        assert!((skew - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_skew_undefined_cases() {
        assert_eq!(volatility_skew(Some(0.0), Some(18.0), Some(24.0)), None);
        assert_eq!(volatility_skew(None, Some(18.0), Some(24.0)), None);
        assert_eq!(volatility_skew(Some(20.0), None, Some(24.0)), None);
        assert_eq!(volatility_skew(Some(20.0), Some(18.0), None), None);
    }

    #[test]
    fn test_resolve_full_coverage() {
        let resolver = SkewResolver::new(&full_chain(day(2)));
        let records = resolver.resolve(&[point(day(2))]);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.atm_iv, Some(20.0));
        assert_eq!(r.otm_call_iv, Some(18.0));
        assert_eq!(r.otm_put_iv, Some(24.0));
        assert!((r.volatility_skew.unwrap() - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_atm_requires_both_legs() {
        let mut chain = full_chain(day(2));
        chain.remove(1); // ATM put
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);

        assert_eq!(records[0].atm_iv, None);
        assert_eq!(records[0].otm_call_iv, Some(18.0));
        assert_eq!(records[0].otm_put_iv, Some(24.0));
        assert_eq!(records[0].volatility_skew, None);
    }

    #[test]
    fn test_otm_legs_resolve_independently() {
        let mut chain = full_chain(day(2));
        chain.remove(2); // OTM call
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);

        assert_eq!(records[0].atm_iv, Some(20.0));
        assert_eq!(records[0].otm_call_iv, None);
        assert_eq!(records[0].otm_put_iv, Some(24.0));
        assert_eq!(records[0].volatility_skew, None);
    }

    #[test]
    fn test_wrong_type_at_strike_does_not_match() {
        // a put quoted at the OTM call strike is not an OTM call
        let chain = vec![leg(day(2), dec!(4300), OptionType::Put, 5.0)];
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);
        assert_eq!(records[0].otm_call_iv, None);
    }

    #[test]
    fn test_exact_strike_only() {
        let chain = vec![
            leg(day(2), dec!(4290), OptionType::Call, 19.0),
            leg(day(2), dec!(4290), OptionType::Put, 21.0),
            leg(day(2), dec!(4305), OptionType::Call, 15.0),
            leg(day(2), dec!(4280), OptionType::Put, 24.0),
        ];
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);
        assert_eq!(records[0].otm_call_iv, None);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut chain = full_chain(day(2));
        chain.push(leg(day(2), dec!(4300), OptionType::Call, 99.0));
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);
        assert_eq!(records[0].otm_call_iv, Some(18.0));
    }

    #[test]
    fn test_index_collapses_duplicate_legs() {
        let mut chain = full_chain(day(2));
        chain.push(leg(day(2), dec!(4300.0), OptionType::Call, 99.0));
        let index = OptionIndex::build(&chain);
        assert_eq!(index.len(), 4);
        assert!(!index.is_empty());

        let empty = OptionIndex::build(&[]);
        assert!(empty.is_empty());
        let records = SkewResolver::new(&[]).resolve(&[point(day(2))]);
        assert!(!records[0].has_coverage());
    }

    #[test]
    fn test_strike_scale_does_not_matter() {
        let chain = vec![
            leg(day(2), dec!(4290.00), OptionType::Call, 19.0),
            leg(day(2), dec!(4290.0), OptionType::Put, 21.0),
        ];
        let records = SkewResolver::new(&chain).resolve(&[point(day(2))]);
        assert_eq!(records[0].atm_iv, Some(20.0));
    }

    #[test]
    fn test_no_coverage_propagates_row() {
        let resolver = SkewResolver::new(&full_chain(day(2)));
        let mut bare = point(day(3));
        bare.strikes = None;
        let records = resolver.resolve(&[point(day(3)), bare, point(day(2))]);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date(), day(3));
        assert!(!records[0].has_coverage());
        assert_eq!(records[0].volatility_skew, None);
        assert!(!records[1].has_coverage());
        assert!(records[2].has_coverage());
        assert!((coverage_ratio(&records) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_coverage_ratio_empty() {
        assert_eq!(coverage_ratio(&[]), 0.0);
    }
}
