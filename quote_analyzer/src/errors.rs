use chrono::NaiveDate;
use thiserror::Error;

use crate::providers::ProviderError;

/// The unified error type for the `quote_analyzer` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input to a series or container (e.g., mismatched column lengths).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The page source ran out of history before the requested size was reached.
    #[error("Insufficient data for {symbol}: requested {requested} records, source exhausted after {available}")]
    InsufficientData {
        symbol: String,
        requested: usize,
        available: usize,
    },

    /// A caller-supplied parameter is out of range (e.g., period longer than the series).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The upper and lower bands coincide, so %B is undefined.
    #[error("Degenerate window at {date}: upper and lower bands coincide")]
    DegenerateWindow { date: NaiveDate },

    /// The page source returned pages that do not overlap or are out of order.
    #[error("Page source contract violated: {0}")]
    SourceContract(String),

    /// An error originating from the page source itself.
    #[error("Page source failed: {0}")]
    Source(#[from] ProviderError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
