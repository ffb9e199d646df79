//! Canonical in-memory representation of one daily trading session.
//!
//! This is the standard output of every [`PageSource`](crate::providers::PageSource)
//! implementation, regardless of the vendor behind it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading session's data for a single security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingRecord {
    /// Session date. Unique within a series.
    pub date: NaiveDate,

    /// Closing price (or the typical price on venues that publish one).
    pub price: f64,

    /// Lowest price during the session.
    pub low: f64,

    /// Highest price during the session.
    pub high: f64,

    /// Shares traded.
    pub volume: f64,

    /// Traded value.
    pub amount: f64,
}

/// One response from a page source, ordered most recent first.
///
/// Consecutive pages overlap by exactly one record: the last record of a page
/// is repeated as the first record of the page anchored at its date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<TradingRecord>,

    /// The source found no earlier history after `records`.
    pub exhausted: bool,
}

impl Page {
    pub fn new(records: Vec<TradingRecord>) -> Self {
        Self {
            records,
            exhausted: false,
        }
    }

    pub fn exhausted(records: Vec<TradingRecord>) -> Self {
        Self {
            records,
            exhausted: true,
        }
    }
}
