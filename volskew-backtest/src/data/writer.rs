//! Output tables.
//!
//! - `skew_data.csv`: one line per skew record
//! - `signals.csv`: one line per signal record, with the strategy curve
//!   alongside when a backtest was run
//! - `summary.json`: run diagnostics and performance metrics
//!
//! Missing values are written as empty cells.

use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::backtest::BacktestResult;

use super::types::{SignalRecord, SkewRecord};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the skew table.
pub fn skew_frame(records: &[SkewRecord]) -> PolarsResult<DataFrame> {
    let date: Vec<String> = records.iter().map(|r| r.date().to_string()).collect();
    let expiry: Vec<String> = records.iter().map(|r| r.expiry().to_string()).collect();
    let days_to_expiry: Vec<f64> = records.iter().map(|r| r.days_to_expiry()).collect();
    let underlying_close: Vec<f64> = records.iter().map(|r| r.point.underlying_close).collect();
    let atm_strike: Vec<Option<String>> = records
        .iter()
        .map(|r| r.point.atm_strike().map(|s| s.to_string()))
        .collect();
    let otm_call_strike: Vec<Option<String>> = records
        .iter()
        .map(|r| r.point.otm_call_strike().map(|s| s.to_string()))
        .collect();
    let otm_put_strike: Vec<Option<String>> = records
        .iter()
        .map(|r| r.point.otm_put_strike().map(|s| s.to_string()))
        .collect();
    let call_iv_mean: Vec<f64> = records.iter().map(|r| r.point.call_iv_mean).collect();
    let put_iv_mean: Vec<f64> = records.iter().map(|r| r.point.put_iv_mean).collect();
    let atm_iv: Vec<Option<f64>> = records.iter().map(|r| r.atm_iv).collect();
    let otm_call_iv: Vec<Option<f64>> = records.iter().map(|r| r.otm_call_iv).collect();
    let otm_put_iv: Vec<Option<f64>> = records.iter().map(|r| r.otm_put_iv).collect();
    let volatility_skew: Vec<Option<f64>> = records.iter().map(|r| r.volatility_skew).collect();

    DataFrame::new(vec![
        Series::new("date".into(), date).into(),
        Series::new("expiry".into(), expiry).into(),
        Series::new("days_to_expiry".into(), days_to_expiry).into(),
        Series::new("underlying_close".into(), underlying_close).into(),
        Series::new("atm_strike".into(), atm_strike).into(),
        Series::new("otm_call_strike".into(), otm_call_strike).into(),
        Series::new("otm_put_strike".into(), otm_put_strike).into(),
        Series::new("call_iv_mean".into(), call_iv_mean).into(),
        Series::new("put_iv_mean".into(), put_iv_mean).into(),
        Series::new("atm_iv".into(), atm_iv).into(),
        Series::new("otm_call_iv".into(), otm_call_iv).into(),
        Series::new("otm_put_iv".into(), otm_put_iv).into(),
        Series::new("volatility_skew".into(), volatility_skew).into(),
    ])
}

/// Build the signal table, joined row by row with the backtest curve if given.
///
/// The curve must have one point per signal record.
pub fn signal_frame(
    records: &[SignalRecord],
    backtest: Option<&BacktestResult>,
) -> PolarsResult<DataFrame> {
    let date: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
    let expiry: Vec<String> = records.iter().map(|r| r.expiry.to_string()).collect();
    let days_to_expiry: Vec<f64> = records.iter().map(|r| r.days_to_expiry).collect();
    let underlying_close: Vec<f64> = records.iter().map(|r| r.underlying_close).collect();
    let skew: Vec<Option<f64>> = records.iter().map(|r| r.skew).collect();
    let lower_bound: Vec<Option<f64>> = records.iter().map(|r| r.lower_bound).collect();
    let upper_bound: Vec<Option<f64>> = records.iter().map(|r| r.upper_bound).collect();
    let signal: Vec<i32> = records.iter().map(|r| i32::from(r.signal)).collect();
    let position: Vec<i32> = records.iter().map(|r| i32::from(r.position)).collect();

    let mut columns: Vec<Column> = vec![
        Series::new("date".into(), date).into(),
        Series::new("expiry".into(), expiry).into(),
        Series::new("days_to_expiry".into(), days_to_expiry).into(),
        Series::new("underlying_close".into(), underlying_close).into(),
        Series::new("volatility_skew".into(), skew).into(),
        Series::new("lower_bound".into(), lower_bound).into(),
        Series::new("upper_bound".into(), upper_bound).into(),
        Series::new("signal".into(), signal).into(),
        Series::new("position".into(), position).into(),
    ];

    if let Some(result) = backtest {
        let curve = &result.equity_curve;
        if curve.len() != records.len() {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "equity curve has {} points for {} signal records",
                    curve.len(),
                    records.len()
                )
                .into(),
            ));
        }

        let market_return: Vec<f64> = curve.iter().map(|p| p.market_return).collect();
        let strategy_return: Vec<f64> = curve.iter().map(|p| p.strategy_return).collect();
        let compound_market: Vec<f64> = curve.iter().map(|p| p.compound_market).collect();
        let compound_strategy: Vec<f64> = curve.iter().map(|p| p.compound_strategy).collect();
        let drawdown_pct: Vec<f64> = curve.iter().map(|p| p.drawdown_pct).collect();

        columns.push(Series::new("market_return".into(), market_return).into());
        columns.push(Series::new("strategy_return".into(), strategy_return).into());
        columns.push(Series::new("compound_market".into(), compound_market).into());
        columns.push(Series::new("compound_strategy".into(), compound_strategy).into());
        columns.push(Series::new("drawdown_pct".into(), drawdown_pct).into());
    }

    DataFrame::new(columns)
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<(), WriterError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

pub fn write_skew_table(path: &Path, records: &[SkewRecord]) -> Result<(), WriterError> {
    let mut df = skew_frame(records)?;
    write_csv(path, &mut df)?;
    info!("Wrote {} skew rows to {}", df.height(), path.display());
    Ok(())
}

pub fn write_signal_table(
    path: &Path,
    records: &[SignalRecord],
    backtest: Option<&BacktestResult>,
) -> Result<(), WriterError> {
    let mut df = signal_frame(records, backtest)?;
    write_csv(path, &mut df)?;
    info!("Wrote {} signal rows to {}", df.height(), path.display());
    Ok(())
}

/// Write any serializable summary as pretty JSON.
pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<(), WriterError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{BacktestConfig, BacktestEngine};
    use crate::data::{GridPoint, StrikeGrid};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn skew_record(strikes: Option<StrikeGrid>, skew: Option<f64>) -> SkewRecord {
        SkewRecord {
            point: GridPoint {
                date: NaiveDate::from_ymd_opt(2023, 10, 2).unwrap(),
                expiry: NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
                underlying_close: 4288.0,
                days_to_expiry: 30.0,
                call_iv_mean: 0.15,
                put_iv_mean: 0.18,
                strikes,
            },
            atm_iv: skew.map(|_| 20.0),
            otm_call_iv: skew.map(|_| 18.0),
            otm_put_iv: skew.map(|_| 24.0),
            volatility_skew: skew,
        }
    }

    fn signal_record(offset: i64, close: f64, signal: i8) -> SignalRecord {
        let date = NaiveDate::from_ymd_opt(2023, 10, 2).unwrap() + chrono::Duration::days(offset);
        SignalRecord {
            date,
            expiry: date + chrono::Duration::days(30),
            days_to_expiry: 30.0,
            underlying_close: close,
            skew: if signal == 0 { None } else { Some(0.3) },
            lower_bound: Some(-0.55),
            upper_bound: Some(0.18),
            signal,
            position: signal,
        }
    }

    #[test]
    fn test_skew_frame_shape() {
        let grid = StrikeGrid {
            atm: dec!(4290),
            otm_call: dec!(4300),
            otm_put: dec!(4280),
        };
        let records = vec![skew_record(Some(grid), Some(0.3)), skew_record(None, None)];
        let df = skew_frame(&records).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 13);
        let strikes = df.column("atm_strike").unwrap().str().unwrap().clone();
        assert_eq!(strikes.get(0), Some("4290"));
        assert_eq!(strikes.get(1), None);
        assert_eq!(df.column("volatility_skew").unwrap().null_count(), 1);
    }

    #[test]
    fn test_signal_frame_with_backtest() {
        let records = vec![signal_record(0, 100.0, 1), signal_record(1, 110.0, 0)];
        let result = BacktestEngine::new(BacktestConfig::default()).run(&records);

        let plain = signal_frame(&records, None).unwrap();
        assert_eq!(plain.width(), 9);

        let joined = signal_frame(&records, Some(&result)).unwrap();
        assert_eq!(joined.width(), 14);
        assert!(joined.column("strategy_return").is_ok());
    }

    #[test]
    fn test_signal_frame_rejects_mismatched_curve() {
        let records = vec![signal_record(0, 100.0, 1), signal_record(1, 110.0, 0)];
        let result = BacktestEngine::new(BacktestConfig::default()).run(&records[..1]);

        let err = signal_frame(&records, Some(&result)).unwrap_err();
        assert!(matches!(err, PolarsError::ShapeMismatch(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.csv");
        let err = write_signal_table(&path, &records, Some(&result)).unwrap_err();
        assert!(matches!(err, WriterError::Polars(_)));
    }

    #[test]
    fn test_write_tables() {
        let dir = tempfile::tempdir().unwrap();
        let skew_path = dir.path().join("out").join("skew_data.csv");
        let signal_path = dir.path().join("out").join("signals.csv");

        write_skew_table(&skew_path, &[skew_record(None, None)]).unwrap();
        write_signal_table(&signal_path, &[signal_record(0, 100.0, 0)], None).unwrap();

        let skew_csv = fs::read_to_string(&skew_path).unwrap();
        let mut lines = skew_csv.lines();
        assert!(lines.next().unwrap().starts_with("date,expiry,days_to_expiry"));
        // missing strikes and IVs are empty cells
        assert!(lines.next().unwrap().contains(",,,"));

        let signal_csv = fs::read_to_string(&signal_path).unwrap();
        assert_eq!(signal_csv.lines().count(), 2);
        assert!(signal_csv.lines().next().unwrap().ends_with("signal,position"));
    }

    #[test]
    fn test_write_summary() {
        #[derive(Serialize)]
        struct Summary {
            dates: usize,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&path, &Summary { dates: 3 }).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dates"], 3);
    }
}
