//! Contract normalizer.
//!
//! Splits each wide quote row into one record per option leg. All call legs
//! are emitted first, then all put legs, each block in input order. Legs
//! without a positive last price or without a strike are dropped.

use crate::data::{OptionRecord, OptionType};

use super::quotes::FilteredQuote;

/// Reshape filtered quotes into a long table of option legs.
pub fn normalize(quotes: &[FilteredQuote]) -> Vec<OptionRecord> {
    let mut records = Vec::with_capacity(quotes.len() * 2);

    for option_type in [OptionType::Call, OptionType::Put] {
        records.extend(quotes.iter().filter_map(|quote| leg(quote, option_type)));
    }

    records
}

fn leg(quote: &FilteredQuote, option_type: OptionType) -> Option<OptionRecord> {
    let last_price = match option_type {
        OptionType::Call => quote.call_last,
        OptionType::Put => quote.put_last,
    }?;

    if last_price.is_nan() || last_price <= 0.0 {
        return None;
    }

    Some(OptionRecord {
        date: quote.quote_date,
        expiry: quote.expiry,
        strike: quote.strike?.normalize(),
        option_type,
        last_price,
    })
}
