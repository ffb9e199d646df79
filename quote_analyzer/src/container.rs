//! Validated, read-only holder of one security's assembled history.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    indicators::{BollingerSettings, IndicatorTable, bollinger_bands},
    models::{
        exchange::Exchange,
        series::{Series, SeriesColumns},
    },
};

/// Construction rules for [`SeriesContainer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerPolicy {
    /// Reject containers shorter than this. `None` accepts any length, including zero.
    pub min_length: Option<usize>,
}

/// Six parallel columns plus the identity of the security they describe.
///
/// Built once and never mutated, so it can be shared freely across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesContainer {
    symbol: String,
    exchange: Exchange,
    length: usize,
    columns: SeriesColumns,
}

impl SeriesContainer {
    /// Validates the columns and wraps them.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the columns differ in length.
    /// - [`Error::InvalidParameter`] if the length is below `policy.min_length`.
    pub fn new(
        symbol: impl Into<String>,
        exchange: Exchange,
        columns: SeriesColumns,
        policy: &ContainerPolicy,
    ) -> Result<Self> {
        let symbol = symbol.into();
        let lengths = columns.lengths();
        let length = lengths[0].1;

        if lengths.iter().any(|(_, n)| *n != length) {
            let detail = lengths
                .iter()
                .map(|(name, n)| format!("{name}: {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::Validation(format!(
                "column lengths differ for {symbol}/{exchange}: {detail}"
            )));
        }

        if let Some(min) = policy.min_length {
            if length < min {
                return Err(Error::InvalidParameter(format!(
                    "{symbol}/{exchange} has {length} records, at least {min} required"
                )));
            }
        }

        Ok(Self {
            symbol,
            exchange,
            length,
            columns,
        })
    }

    pub fn from_series(
        symbol: impl Into<String>,
        exchange: Exchange,
        series: Series,
        policy: &ContainerPolicy,
    ) -> Result<Self> {
        Self::new(symbol, exchange, series.into_columns(), policy)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Earliest session held, used to identify the container in diagnostics.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.columns.date.first().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.columns.date.last().copied()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.columns.date
    }

    pub fn prices(&self) -> &[f64] {
        &self.columns.price
    }

    pub fn lows(&self) -> &[f64] {
        &self.columns.low
    }

    pub fn highs(&self) -> &[f64] {
        &self.columns.high
    }

    pub fn volumes(&self) -> &[f64] {
        &self.columns.volume
    }

    pub fn amounts(&self) -> &[f64] {
        &self.columns.amount
    }

    /// Bollinger Bands over the price column.
    pub fn compute_indicators(&self, settings: &BollingerSettings) -> Result<IndicatorTable> {
        bollinger_bands(&self.columns.date, &self.columns.price, settings)
    }
}

impl fmt::Display for SeriesContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (length: {}, ref_date: ", self.symbol, self.exchange, self.length)?;
        match self.reference_date() {
            Some(d) => write!(f, "{d})"),
            None => f.write_str("none)"),
        }
    }
}
