//! Quote file loader.
//!
//! Reads a directory of end-of-day option quote files into [`RawQuoteRow`]s.
//! Each line of a file carries the call and put quote for one
//! (quote date, expiry, strike).
//!
//! Supported inputs:
//! - `.csv` / `.txt`: comma-separated with a header row
//! - `.parquet`
//!
//! Every column is read as text and coerced per cell, so a malformed value
//! only affects its own row. Rows whose quote or expiry date cannot be
//! parsed are dropped here; all other coercion failures are left as `None`
//! for the downstream stages to count.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SchemaMapping;

use super::types::RawQuoteRow;

/// File extensions picked up by [`QuoteLoader::discover_files`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "txt", "parquet"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Missing column '{column}' in {file}")]
    MissingColumn { column: String, file: String },

    #[error("No quote files found in {0}")]
    NoInputFiles(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Row counts from loading one or more files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub files: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows dropped because the quote or expiry date did not parse.
    pub bad_dates: usize,
}

impl LoadStats {
    pub fn merge(&mut self, other: LoadStats) {
        self.files += other.files;
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.bad_dates += other.bad_dates;
    }
}

/// Rows loaded from one or more files.
#[derive(Debug, Clone, Default)]
pub struct LoadedQuotes {
    pub rows: Vec<RawQuoteRow>,
    pub stats: LoadStats,
}

impl LoadedQuotes {
    pub fn extend(&mut self, other: LoadedQuotes) {
        self.rows.extend(other.rows);
        self.stats.merge(other.stats);
    }
}

/// Loader for a directory of quote files.
pub struct QuoteLoader {
    data_dir: PathBuf,
    schema: SchemaMapping,
}

impl QuoteLoader {
    pub fn new(data_dir: impl Into<PathBuf>, schema: SchemaMapping) -> Self {
        Self {
            data_dir: data_dir.into(),
            schema,
        }
    }

    /// Quote files in the data directory, sorted by file name.
    ///
    /// The scan is not recursive. Files with other extensions are skipped.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>, LoaderError> {
        let dir = self.data_dir.as_path();
        if !dir.is_dir() {
            return Err(LoaderError::NoInputFiles(dir.display().to_string()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if supported {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(LoaderError::NoInputFiles(dir.display().to_string()));
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Read one file into a DataFrame.
    pub fn read_frame(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let is_parquet = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        let df = if is_parquet {
            LazyFrame::scan_parquet(path, ScanArgsParquet::default())?.collect()?
        } else {
            // Schema length 0 reads every column as String
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        };

        Ok(df)
    }

    /// Load one file into raw quote rows.
    pub fn load_file(&self, path: &Path) -> Result<LoadedQuotes, LoaderError> {
        let df = self.read_frame(path)?;
        let file = path.display().to_string();

        let quote_date = text_column(&df, &self.schema.quote_date, &file)?;
        let expiry = text_column(&df, &self.schema.expiry, &file)?;
        let dte = text_column(&df, &self.schema.dte, &file)?;
        let underlying_last = text_column(&df, &self.schema.underlying_last, &file)?;
        let strike = text_column(&df, &self.schema.strike, &file)?;
        let call_iv = text_column(&df, &self.schema.call_iv, &file)?;
        let put_iv = text_column(&df, &self.schema.put_iv, &file)?;
        let call_last = text_column(&df, &self.schema.call_last, &file)?;
        let put_last = text_column(&df, &self.schema.put_last, &file)?;

        let mut stats = LoadStats {
            files: 1,
            rows_read: df.height(),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(df.height());

        for idx in 0..df.height() {
            let dates = (
                quote_date.get(idx).and_then(parse_date),
                expiry.get(idx).and_then(parse_date),
            );
            let (Some(quote_date), Some(expiry)) = dates else {
                stats.bad_dates += 1;
                continue;
            };

            rows.push(RawQuoteRow {
                quote_date,
                expiry,
                dte: dte.get(idx).and_then(parse_number),
                underlying_last: underlying_last.get(idx).and_then(parse_number),
                strike: strike.get(idx).and_then(parse_strike),
                call_iv: call_iv.get(idx).and_then(parse_number),
                put_iv: put_iv.get(idx).and_then(parse_number),
                call_last: call_last.get(idx).and_then(parse_number),
                put_last: put_last.get(idx).and_then(parse_number),
            });
        }

        stats.rows_kept = rows.len();
        debug!(
            "{}: {} rows read, {} kept, {} bad dates",
            file, stats.rows_read, stats.rows_kept, stats.bad_dates
        );

        Ok(LoadedQuotes { rows, stats })
    }

    /// Load every quote file in the data directory, in file name order.
    pub fn load_all(&self) -> Result<LoadedQuotes, LoaderError> {
        let mut loaded = LoadedQuotes::default();
        for path in self.discover_files()? {
            loaded.extend(self.load_file(&path)?);
        }

        info!(
            "Loaded {} rows from {} files ({} dropped on dates)",
            loaded.stats.rows_kept, loaded.stats.files, loaded.stats.bad_dates
        );

        Ok(loaded)
    }
}

/// Find a column by name, ignoring surrounding whitespace on both sides.
pub fn resolve_column(df: &DataFrame, name: &str, file: &str) -> Result<String, LoaderError> {
    df.get_column_names()
        .into_iter()
        .find(|c| c.as_str().trim() == name.trim())
        .map(|c| c.to_string())
        .ok_or_else(|| LoaderError::MissingColumn {
            column: name.trim().to_string(),
            file: file.to_string(),
        })
}

/// A column cast to text.
fn text_column(df: &DataFrame, name: &str, file: &str) -> Result<StringChunked, LoaderError> {
    let column = resolve_column(df, name, file)?;
    let cast = df.column(&column)?.cast(&DataType::String)?;
    Ok(cast.str()?.clone())
}

/// Parse `YYYY-MM-DD`, optionally followed by a time.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let day = cell.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Parse a finite number. Empty cells and junk are `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a strike exactly, falling back to the float reading for forms like
/// `4.0e3` that the decimal parser rejects.
pub fn parse_strike(cell: &str) -> Option<Decimal> {
    Decimal::from_str(cell.trim())
        .ok()
        .or_else(|| parse_number(cell).and_then(Decimal::from_f64_retain))
        .map(|d| d.normalize())
}
