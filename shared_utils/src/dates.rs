//! The quote API exchanges dates as compact `YYYYMMDD` strings.

use chrono::NaiveDate;
use thiserror::Error;

const COMPACT_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
#[error("Invalid compact date '{input}': {source}")]
pub struct CompactDateError {
    pub input: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Parses `20240105` into a calendar date.
pub fn parse_compact_date(input: &str) -> Result<NaiveDate, CompactDateError> {
    NaiveDate::parse_from_str(input.trim(), COMPACT_FORMAT).map_err(|source| CompactDateError {
        input: input.to_string(),
        source,
    })
}

/// Formats a calendar date as `YYYYMMDD`.
pub fn format_compact_date(date: NaiveDate) -> String {
    date.format(COMPACT_FORMAT).to_string()
}
