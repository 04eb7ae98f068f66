pub mod analytics;
pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod pipeline;
pub mod signal;
pub mod validation;

// Re-export commonly used types
pub use analytics::{FilterStats, OptionIndex, SkewResolver};
pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, CostModel};
pub use config::{ConfigError, PipelineConfig, SchemaMapping};
pub use data::{GridPoint, OptionRecord, OptionType, QuoteLoader, RawQuoteRow, SignalRecord, SkewRecord};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use pipeline::{PipelineError, PipelineOutput, RunSummary, SkewPipeline};
pub use signal::{SignalConfig, SignalEngine, ThresholdMode};
pub use validation::CoverageReport;
