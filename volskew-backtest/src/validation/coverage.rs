//! Coverage diagnostics for a pipeline run.
//!
//! Checks:
//! - Strike increment established
//! - Strike grid exactness (ATM on the increment, OTM width 4 increments)
//! - ATM IV coverage of grid points
//! - Skew coverage of signal dates
//!
//! None of these gate the run. Sparse data degrades coverage, and the
//! report is how a caller sees it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{coverage_ratio, FilterStats};
use crate::data::{GridPoint, SignalRecord, SkewRecord};

/// Result of a single diagnostic check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Distribution of the skew values that could be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkewDistribution {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SkewDistribution {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        };
        let std_dev = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: n,
            mean,
            median,
            std_dev,
            min: values[0],
            max: values[n - 1],
        })
    }
}

/// Complete coverage report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub filter: FilterStats,
    pub option_records: usize,
    pub strike_increment: Option<Decimal>,
    pub grid_points: usize,
    pub with_atm_iv: usize,
    pub with_skew: usize,
    pub coverage_ratio: f64,
    pub signal_dates: usize,
    pub signal_dates_with_skew: usize,
    pub skew: Option<SkewDistribution>,
    pub checks: Vec<CheckResult>,
}

impl CoverageReport {
    pub fn build(
        filter: FilterStats,
        option_records: usize,
        strike_increment: Option<Decimal>,
        skew_records: &[SkewRecord],
        signals: &[SignalRecord],
    ) -> Self {
        let with_atm_iv = skew_records.iter().filter(|r| r.has_coverage()).count();
        let with_skew = skew_records
            .iter()
            .filter(|r| r.volatility_skew.is_some())
            .count();
        let signal_dates_with_skew = signals.iter().filter(|s| s.skew.is_some()).count();

        let points: Vec<&GridPoint> = skew_records.iter().map(|r| &r.point).collect();
        let checks = vec![
            check_increment(strike_increment),
            check_grid_exactness(&points, strike_increment),
            check_ratio("atm_coverage", "grid points with ATM IV", with_atm_iv, skew_records.len()),
            check_ratio("signal_coverage", "signal dates with skew", signal_dates_with_skew, signals.len()),
        ];

        Self {
            filter,
            option_records,
            strike_increment,
            grid_points: skew_records.len(),
            with_atm_iv,
            with_skew,
            coverage_ratio: coverage_ratio(skew_records),
            signal_dates: signals.len(),
            signal_dates_with_skew,
            skew: SkewDistribution::from_values(skew_records.iter().filter_map(|r| r.volatility_skew)),
            checks,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} grid points, {} with ATM IV ({:.1}%), {} with skew; {} signal dates: {}/{} checks passed",
            self.grid_points,
            self.with_atm_iv,
            self.coverage_ratio * 100.0,
            self.with_skew,
            self.signal_dates,
            passed,
            self.checks.len()
        )
    }
}

fn check_increment(increment: Option<Decimal>) -> CheckResult {
    match increment {
        Some(inc) => CheckResult::pass("strike_increment", &format!("Strike increment {}", inc)),
        None => CheckResult::fail(
            "strike_increment",
            "No strike increment",
            Some("fewer than two distinct strikes on the sample date".to_string()),
        ),
    }
}

fn check_grid_exactness(points: &[&GridPoint], increment: Option<Decimal>) -> CheckResult {
    let Some(inc) = increment else {
        return CheckResult::pass("strike_grid", "No grid to check");
    };

    let bad: Vec<String> = points
        .iter()
        .filter_map(|p| p.strikes.map(|s| (p, s)))
        .filter(|(_, s)| s.atm % inc != Decimal::ZERO || s.otm_call - s.otm_put != inc * Decimal::from(4))
        .map(|(p, s)| format!("{}/{}: atm {}", p.date, p.expiry, s.atm))
        .take(5)
        .collect();

    if bad.is_empty() {
        CheckResult::pass("strike_grid", "All grid strikes on the increment")
    } else {
        CheckResult::fail("strike_grid", "Grid strikes off the increment", Some(bad.join(", ")))
    }
}

fn check_ratio(name: &str, what: &str, hits: usize, total: usize) -> CheckResult {
    let message = format!("{}/{} {}", hits, total, what);
    if hits > 0 {
        CheckResult::pass(name, &message)
    } else {
        CheckResult::fail(name, &message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StrikeGrid;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn skew_record(atm_iv: Option<f64>, skew: Option<f64>) -> SkewRecord {
        SkewRecord {
            point: GridPoint {
                date: NaiveDate::from_ymd_opt(2023, 10, 2).unwrap(),
                expiry: NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
                underlying_close: 4288.0,
                days_to_expiry: 30.0,
                call_iv_mean: 0.15,
                put_iv_mean: 0.18,
                strikes: Some(StrikeGrid {
                    atm: dec!(4290),
                    otm_call: dec!(4300),
                    otm_put: dec!(4280),
                }),
            },
            atm_iv,
            otm_call_iv: None,
            otm_put_iv: None,
            volatility_skew: skew,
        }
    }

    #[test]
    fn test_skew_distribution() {
        let dist = SkewDistribution::from_values([0.3, -0.1, 0.1, f64::NAN]).unwrap();
        assert_eq!(dist.count, 3);
        assert!((dist.mean - 0.1).abs() < 1e-12);
        assert_eq!(dist.median, 0.1);
        assert!((dist.std_dev - 0.2).abs() < 1e-12);
        assert_eq!(dist.min, -0.1);
        assert_eq!(dist.max, 0.3);

        let even = SkewDistribution::from_values([1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(even.median, 2.5);

        assert!(SkewDistribution::from_values(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_report_counts() {
        let records = vec![
            skew_record(Some(20.0), Some(0.3)),
            skew_record(Some(20.0), None),
            skew_record(None, None),
            skew_record(None, None),
        ];
        let report = CoverageReport::build(FilterStats::default(), 10, Some(dec!(5)), &records, &[]);

        assert_eq!(report.grid_points, 4);
        assert_eq!(report.with_atm_iv, 2);
        assert_eq!(report.with_skew, 1);
        assert_eq!(report.coverage_ratio, 0.5);
        assert_eq!(report.skew.unwrap().count, 1);
        // no signal dates
        assert!(!report.all_passed());
        assert_eq!(report.failed_checks().len(), 1);
        assert_eq!(report.failed_checks()[0].name, "signal_coverage");
    }

    #[test]
    fn test_grid_check_flags_off_increment() {
        let mut record = skew_record(Some(20.0), Some(0.3));
        record.point.strikes = Some(StrikeGrid {
            atm: dec!(4292),
            otm_call: dec!(4302),
            otm_put: dec!(4282),
        });
        let report = CoverageReport::build(FilterStats::default(), 4, Some(dec!(5)), &[record], &[]);
        let grid = report.checks.iter().find(|c| c.name == "strike_grid").unwrap();
        assert!(!grid.passed);
    }

    #[test]
    fn test_missing_increment_check() {
        let report = CoverageReport::build(FilterStats::default(), 0, None, &[], &[]);
        assert!(!report.checks[0].passed);
        assert_eq!(report.coverage_ratio, 0.0);
        assert!(report.summary().contains("0 grid points"));
    }
}
