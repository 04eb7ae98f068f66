//! Pipeline configuration.
//!
//! One [`PipelineConfig`] is passed into every stage. It is usually read
//! from a TOML file; every section falls back to its defaults, so an empty
//! file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::BacktestConfig;
use crate::signal::{SignalConfig, ThresholdMode};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Column names of the quote files.
///
/// Defaults match the OptionsDX end-of-day SPX export. Header cells are
/// compared after trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMapping {
    pub quote_date: String,
    pub expiry: String,
    pub dte: String,
    pub underlying_last: String,
    pub strike: String,
    pub call_iv: String,
    pub put_iv: String,
    pub call_last: String,
    pub put_last: String,
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self {
            quote_date: "[QUOTE_DATE]".to_string(),
            expiry: "[EXPIRE_DATE]".to_string(),
            dte: "[DTE]".to_string(),
            underlying_last: "[UNDERLYING_LAST]".to_string(),
            strike: "[STRIKE]".to_string(),
            call_iv: "[C_IV]".to_string(),
            put_iv: "[P_IV]".to_string(),
            call_last: "[C_LAST]".to_string(),
            put_last: "[P_LAST]".to_string(),
        }
    }
}

impl SchemaMapping {
    /// All required column names, in declaration order.
    pub fn required_columns(&self) -> [&str; 9] {
        [
            &self.quote_date,
            &self.expiry,
            &self.dte,
            &self.underlying_last,
            &self.strike,
            &self.call_iv,
            &self.put_iv,
            &self.call_last,
            &self.put_last,
        ]
    }
}

/// Inclusive days-to-expiry window applied before any aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DteBounds {
    pub min_dte: f64,
    pub max_dte: f64,
}

impl Default for DteBounds {
    fn default() -> Self {
        Self {
            min_dte: 10.0,
            max_dte: 180.0,
        }
    }
}

impl DteBounds {
    pub fn contains(&self, dte: f64) -> bool {
        dte >= self.min_dte && dte <= self.max_dte
    }
}

/// Strike grid settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeConfig {
    /// Fixed strike increment. When unset, the increment is detected from
    /// the first quote date's strikes.
    pub increment: Option<Decimal>,
}

/// Output artifact locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub skew_file: String,
    pub signals_file: String,
    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            skew_file: "skew_data.csv".to_string(),
            signals_file: "signals.csv".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn skew_path(&self) -> PathBuf {
        self.dir.join(&self.skew_file)
    }

    pub fn signals_path(&self) -> PathBuf {
        self.dir.join(&self.signals_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(&self.summary_file)
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema: SchemaMapping,
    pub dte: DteBounds,
    pub strike: StrikeConfig,
    pub signal: SignalConfig,
    pub backtest: BacktestConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dte.min_dte > self.dte.max_dte {
            return Err(ConfigError::Invalid(format!(
                "min_dte ({}) exceeds max_dte ({})",
                self.dte.min_dte, self.dte.max_dte
            )));
        }

        if let Some(increment) = self.strike.increment {
            if increment <= Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "strike increment must be positive, got {}",
                    increment
                )));
            }
        }

        if let ThresholdMode::Percentile {
            window,
            long_pct,
            short_pct,
        } = self.signal.thresholds
        {
            if window == 0 {
                return Err(ConfigError::Invalid("percentile window must be >= 1".into()));
            }
            for pct in [long_pct, short_pct] {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(ConfigError::Invalid(format!(
                        "percentile {} outside [0, 100]",
                        pct
                    )));
                }
            }
            if long_pct > short_pct {
                return Err(ConfigError::Invalid(format!(
                    "long percentile ({}) exceeds short percentile ({})",
                    long_pct, short_pct
                )));
            }
        }

        if self.backtest.costs.capital_per_trade <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "capital_per_trade must be positive".into(),
            ));
        }

        for column in self.schema.required_columns() {
            if column.trim().is_empty() {
                return Err(ConfigError::Invalid("empty column name in schema".into()));
            }
        }

        Ok(())
    }
}
