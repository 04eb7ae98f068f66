//! End-to-end skew pipeline.
//!
//! Stages, in order:
//! 1. DTE filter and numeric coercion of raw quote rows
//! 2. Contract normalizer and grid builder (run side by side)
//! 3. Strike increment, configured or detected, and strike grid assignment
//! 4. Skew resolver
//! 5. Signal engine
//! 6. Backtest and metrics, when enabled
//!
//! The core stages never touch the filesystem; [`SkewPipeline::run_from_dir`]
//! and [`SkewPipeline::write_outputs`] are the only I/O entry points.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{
    assign_strikes, build_grid, detect_strike_increment, filter_quotes, normalize, SkewResolver,
};
use crate::backtest::{BacktestEngine, BacktestResult};
use crate::config::{ConfigError, PipelineConfig};
use crate::data::{
    write_signal_table, write_skew_table, write_summary, LoadStats, LoaderError, QuoteLoader,
    RawQuoteRow, SignalRecord, SkewRecord, WriterError,
};
use crate::metrics::{MetricsCalculator, PerformanceMetrics};
use crate::signal::{SignalEngine, SignalSummary, ThresholdMode};
use crate::validation::CoverageReport;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Ingestion counts, set when the run read its own input files.
    pub load: Option<LoadStats>,
    pub strike_increment: Option<Decimal>,
    pub skew_records: Vec<SkewRecord>,
    pub signals: Vec<SignalRecord>,
    pub backtest: Option<BacktestResult>,
    pub metrics: Option<PerformanceMetrics>,
    pub coverage: CoverageReport,
}

impl PipelineOutput {
    pub fn summary(&self, config: &PipelineConfig) -> RunSummary {
        RunSummary {
            thresholds: config.signal.thresholds,
            target_dte: config.signal.target_dte,
            load: self.load,
            coverage: self.coverage.clone(),
            signals: SignalSummary::from_records(&self.signals),
            metrics: self.metrics.clone(),
        }
    }
}

/// Serializable run summary, written as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub thresholds: ThresholdMode,
    pub target_dte: f64,
    pub load: Option<LoadStats>,
    pub coverage: CoverageReport,
    pub signals: SignalSummary,
    pub metrics: Option<PerformanceMetrics>,
}

/// The skew pipeline, bound to one validated configuration.
pub struct SkewPipeline {
    config: PipelineConfig,
}

impl SkewPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over in-memory quote rows.
    pub fn run(&self, rows: &[RawQuoteRow]) -> PipelineOutput {
        let (quotes, filter) = filter_quotes(rows, &self.config.dte);
        info!(
            "{} of {} quote rows inside DTE [{}, {}]",
            filter.kept, filter.rows_seen, self.config.dte.min_dte, self.config.dte.max_dte
        );

        let (option_records, grid) = rayon::join(|| normalize(&quotes), || build_grid(&quotes));
        info!(
            "{} option records, {} grid points",
            option_records.len(),
            grid.len()
        );

        let strike_increment = self
            .config
            .strike
            .increment
            .or_else(|| detect_strike_increment(&option_records));
        match strike_increment {
            Some(inc) => info!("Strike increment: {}", inc),
            None => warn!("No strike increment could be established; skew will be missing"),
        }

        let grid = assign_strikes(grid, strike_increment);
        let skew_records = SkewResolver::new(&option_records).resolve(&grid);
        let signals = SignalEngine::new(self.config.signal.clone()).generate(&skew_records);

        let (backtest, metrics) = if self.config.backtest.enabled {
            let result = BacktestEngine::new(self.config.backtest.clone()).run(&signals);
            let metrics = MetricsCalculator::calculate(&result);
            (Some(result), Some(metrics))
        } else {
            (None, None)
        };

        let coverage = CoverageReport::build(
            filter,
            option_records.len(),
            strike_increment,
            &skew_records,
            &signals,
        );

        PipelineOutput {
            load: None,
            strike_increment,
            skew_records,
            signals,
            backtest,
            metrics,
            coverage,
        }
    }

    /// Load every quote file in `data_dir`, then run.
    pub fn run_from_dir(&self, data_dir: &Path) -> Result<PipelineOutput, PipelineError> {
        let loaded = QuoteLoader::new(data_dir, self.config.schema.clone()).load_all()?;
        let mut output = self.run(&loaded.rows);
        output.load = Some(loaded.stats);
        Ok(output)
    }

    /// Write the skew table, signal table and summary to the output directory.
    pub fn write_outputs(&self, output: &PipelineOutput) -> Result<(), PipelineError> {
        let paths = &self.config.output;
        write_skew_table(&paths.skew_path(), &output.skew_records)?;
        write_signal_table(&paths.signals_path(), &output.signals, output.backtest.as_ref())?;
        write_summary(&paths.summary_path(), &output.summary(&self.config))?;
        Ok(())
    }
}
