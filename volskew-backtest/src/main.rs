//! Volatility skew backtest CLI.
//!
//! # Usage
//!
//! ```bash
//! # Write a default configuration to edit
//! volskew-backtest init --path config/default.toml
//!
//! # Run the pipeline and the backtest
//! volskew-backtest run --config config/default.toml --data data/optionsdx --output outputs
//!
//! # Fixed thresholds, signals only
//! volskew-backtest run --data data/optionsdx --static-thresholds --no-backtest
//!
//! # Check what a data directory contains
//! volskew-backtest inspect --data data/optionsdx
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use volskew_backtest::analytics::{detect_strike_increment, filter_quotes, normalize};
use volskew_backtest::data::{LoadedQuotes, QuoteLoader};
use volskew_backtest::{PipelineConfig, PipelineOutput, SchemaMapping, SkewPipeline, ThresholdMode};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "volskew-backtest")]
#[command(about = "Volatility skew signal pipeline and backtest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the skew pipeline over a directory of quote files
    Run {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to data directory
        #[arg(short, long, default_value = "data/optionsdx")]
        data: PathBuf,

        /// Output directory (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the fixed -0.55 / 0.18 thresholds instead of rolling percentiles
        #[arg(long)]
        static_thresholds: bool,

        /// Generate signals only
        #[arg(long)]
        no_backtest: bool,
    },

    /// Report rows, dates and strike increment of a data directory
    Inspect {
        /// Path to configuration file, for a custom column mapping
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to data directory
        #[arg(short, long, default_value = "data/optionsdx")]
        data: PathBuf,
    },

    /// Write the default configuration to a file
    Init {
        /// Destination path
        #[arg(short, long, default_value = "config/default.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("volskew_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output,
            static_thresholds,
            no_backtest,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(dir) = output {
                config.output.dir = dir;
            }
            if static_thresholds {
                config.signal.thresholds = ThresholdMode::static_defaults();
            }
            if no_backtest {
                config.backtest.enabled = false;
            }
            cmd_run(config, &data)?;
        }
        Commands::Inspect { config, data } => {
            let config = load_config(config.as_deref())?;
            cmd_inspect(config, &data)?;
        }
        Commands::Init { path } => {
            PipelineConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Load every file in the directory with a progress bar.
fn load_with_progress(data_dir: &Path, schema: SchemaMapping) -> Result<LoadedQuotes> {
    let loader = QuoteLoader::new(data_dir, schema);
    let files = loader
        .discover_files()
        .with_context(|| format!("No quote files in {}", data_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut loaded = LoadedQuotes::default();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        pb.set_message(name);
        let file = loader
            .load_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        if file.stats.bad_dates > 0 {
            warn!("{}: {} rows with unparseable dates", path.display(), file.stats.bad_dates);
        }
        loaded.extend(file);
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} rows", loaded.stats.rows_kept));

    Ok(loaded)
}

fn cmd_run(config: PipelineConfig, data_dir: &Path) -> Result<()> {
    let pipeline = SkewPipeline::new(config).context("Invalid configuration")?;
    let loaded = load_with_progress(data_dir, pipeline.config().schema.clone())?;

    let mut output = pipeline.run(&loaded.rows);
    output.load = Some(loaded.stats);

    pipeline
        .write_outputs(&output)
        .context("Failed to write outputs")?;

    print_report(&pipeline, &output);
    Ok(())
}

fn print_report(pipeline: &SkewPipeline, output: &PipelineOutput) {
    let coverage = &output.coverage;

    println!("{}", SEPARATOR);
    println!("Volatility Skew Run");
    println!("{}", SEPARATOR);

    if let Some(load) = &output.load {
        println!("\nInput:");
        println!("  Files: {}", load.files);
        println!("  Rows read: {}", load.rows_read);
        println!("  Rows with bad dates: {}", load.bad_dates);
    }

    println!("\nPipeline:");
    println!("  Rows in DTE window: {}", coverage.filter.kept);
    println!("  Rows out of window: {}", coverage.filter.out_of_range);
    println!("  Rows unparseable: {}", coverage.filter.unparseable);
    println!("  Option records: {}", coverage.option_records);
    println!(
        "  Strike increment: {}",
        output
            .strike_increment
            .map(|i| i.to_string())
            .unwrap_or_else(|| "none".into())
    );
    println!("  {}", coverage.summary());

    if let Some(dist) = &coverage.skew {
        println!("\nSkew distribution:");
        println!("  Mean: {:.4}  Median: {:.4}  Std: {:.4}", dist.mean, dist.median, dist.std_dev);
        println!("  Min: {:.4}  Max: {:.4}", dist.min, dist.max);
    }

    for check in coverage.failed_checks() {
        println!("  [FAIL] {}: {}", check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    let summary = output.summary(pipeline.config());
    println!("\nSignals:");
    println!("  Dates: {}", summary.signals.dates);
    println!("  -1 (skew low): {}", summary.signals.long_signals);
    println!("  +1 (skew high): {}", summary.signals.short_signals);
    println!("  Flat: {}", summary.signals.flat);
    println!("  Mean DTE: {:.1}", summary.signals.mean_dte);

    if let Some(result) = &output.backtest {
        if let (Some(start), Some(end)) = (result.start_date(), result.end_date()) {
            println!("\nBacktest period: {} to {}", start, end);
        }
    }

    if let Some(metrics) = &output.metrics {
        println!();
        println!("{}", metrics.summary());
    }

    let paths = &pipeline.config().output;
    println!("\nOutputs:");
    println!("  {}", paths.skew_path().display());
    println!("  {}", paths.signals_path().display());
    println!("  {}", paths.summary_path().display());
    println!("\n{}", SEPARATOR);
}

fn cmd_inspect(config: PipelineConfig, data_dir: &Path) -> Result<()> {
    let loaded = load_with_progress(data_dir, config.schema.clone())?;
    let rows = &loaded.rows;

    let quote_dates: BTreeSet<_> = rows.iter().map(|r| r.quote_date).collect();
    let expiries: BTreeSet<_> = rows.iter().map(|r| r.expiry).collect();
    let dtes: Vec<f64> = rows.iter().filter_map(|r| r.dte).collect();

    let (quotes, filter) = filter_quotes(rows, &config.dte);
    let increment = config
        .strike
        .increment
        .or_else(|| detect_strike_increment(&normalize(&quotes)));

    println!("{}", SEPARATOR);
    println!("Data Inspection: {}", data_dir.display());
    println!("{}", SEPARATOR);
    println!("  Files: {}", loaded.stats.files);
    println!("  Rows read: {}", loaded.stats.rows_read);
    println!("  Rows with bad dates: {}", loaded.stats.bad_dates);
    if let (Some(first), Some(last)) = (quote_dates.first(), quote_dates.last()) {
        println!("  Date range: {} to {}", first, last);
    }
    println!("  Quote dates: {}", quote_dates.len());
    println!("  Expiries: {}", expiries.len());
    if !dtes.is_empty() {
        let min = dtes.iter().copied().fold(f64::INFINITY, f64::min);
        let max = dtes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("  DTE range: {} to {}", min, max);
    }
    println!(
        "  Rows in DTE window [{}, {}]: {}",
        config.dte.min_dte, config.dte.max_dte, filter.kept
    );
    println!(
        "  Strike increment: {}",
        increment
            .map(|i| i.to_string())
            .unwrap_or_else(|| "none".into())
    );
    println!("{}", SEPARATOR);

    Ok(())
}
