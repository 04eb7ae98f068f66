pub mod loader;
pub mod types;
pub mod writer;

pub use loader::{LoadStats, LoadedQuotes, LoaderError, QuoteLoader};
pub use types::{
    GridPoint, OptionRecord, OptionType, RawQuoteRow, SignalRecord, SkewRecord, StrikeGrid,
};
pub use writer::{write_signal_table, write_skew_table, write_summary, WriterError};
