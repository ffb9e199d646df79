//! Chronological series of trading records and its columnar form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    models::record::TradingRecord,
};

/// Trading records ordered oldest first, strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    records: Vec<TradingRecord>,
}

impl Series {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a series from records that are already oldest first.
    ///
    /// Fails with [`Error::Validation`] on a repeated or backwards date.
    pub fn from_chronological(records: Vec<TradingRecord>) -> Result<Self> {
        if let Some(pair) = records.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(Error::Validation(format!(
                "series dates must be strictly increasing, found {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TradingRecord] {
        &self.records
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Splits the records into six parallel columns.
    pub fn into_columns(self) -> SeriesColumns {
        let n = self.records.len();
        let mut cols = SeriesColumns::with_capacity(n);
        for r in self.records {
            cols.date.push(r.date);
            cols.price.push(r.price);
            cols.low.push(r.low);
            cols.high.push(r.high);
            cols.volume.push(r.volume);
            cols.amount.push(r.amount);
        }
        cols
    }
}

/// The six parallel columns of a series. Lengths are only checked when a
/// [`SeriesContainer`](crate::container::SeriesContainer) is built from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumns {
    pub date: Vec<NaiveDate>,
    pub price: Vec<f64>,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
    pub volume: Vec<f64>,
    pub amount: Vec<f64>,
}

impl SeriesColumns {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            date: Vec::with_capacity(n),
            price: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
            amount: Vec::with_capacity(n),
        }
    }

    /// Column lengths in declaration order, for diagnostics.
    pub fn lengths(&self) -> [(&'static str, usize); 6] {
        [
            ("date", self.date.len()),
            ("price", self.price.len()),
            ("low", self.low.len()),
            ("high", self.high.len()),
            ("volume", self.volume.len()),
            ("amount", self.amount.len()),
        ]
    }
}
