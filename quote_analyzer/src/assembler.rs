//! Assembles a gap-free daily series out of overlapping pages.
//!
//! Pages arrive most recent first. Pagination state is nothing more than the
//! next anchor date and the accumulated buffer: when a page runs out before
//! the target is met, the oldest record consumed becomes the next anchor, and
//! the page fetched for it must start with that same record. The copy already
//! in the buffer is dropped and the new page's copy takes its place, so every
//! boundary costs exactly one record.
//!
//! The buffer is reversed once at the end so the returned [`Series`] runs
//! oldest first.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    models::{exchange::Exchange, record::TradingRecord, series::Series},
    providers::PageSource,
};

/// What to do when the source runs out of history before the target size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Fail with [`Error::InsufficientData`].
    #[default]
    Strict,
    /// Return whatever history exists, possibly shorter than requested.
    BestEffort,
}

/// Drives a [`PageSource`] until a series of the requested length is built.
pub struct SeriesAssembler<'a, S: PageSource + ?Sized> {
    source: &'a S,
    policy: ExhaustionPolicy,
}

impl<'a, S: PageSource + ?Sized> SeriesAssembler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            policy: ExhaustionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    /// Collects `target_size` sessions ending at `reference_date`.
    ///
    /// Requests are issued one at a time; each page is awaited before the
    /// next anchor is known.
    pub async fn assemble(
        &self,
        symbol: &str,
        exchange: Exchange,
        reference_date: NaiveDate,
        target_size: usize,
    ) -> Result<Series> {
        if target_size == 0 {
            return Ok(Series::empty());
        }

        let mut buffer: Vec<TradingRecord> = Vec::with_capacity(target_size);
        let mut anchor = reference_date;
        let mut overlap: Option<NaiveDate> = None;

        loop {
            let page = self.source.fetch_page(symbol, exchange, anchor).await?;
            let exhausted = page.exhausted;
            let mut records = page.records.into_iter();

            if let Some(expected) = overlap {
                match records.next() {
                    Some(first) if first.date == expected => {
                        buffer.pop();
                        buffer.push(first);
                    }
                    Some(first) => {
                        return Err(Error::SourceContract(format!(
                            "page for {symbol} anchored at {anchor} starts at {}, expected the boundary record {expected}",
                            first.date
                        )));
                    }
                    None => {}
                }
            }

            let mut fresh = 0usize;
            for record in records.take(target_size - buffer.len()) {
                push_descending(&mut buffer, record, symbol)?;
                fresh += 1;
            }

            if buffer.len() == target_size {
                break;
            }

            if exhausted || fresh == 0 {
                match self.policy {
                    ExhaustionPolicy::Strict => {
                        return Err(Error::InsufficientData {
                            symbol: symbol.to_string(),
                            requested: target_size,
                            available: buffer.len(),
                        });
                    }
                    ExhaustionPolicy::BestEffort => break,
                }
            }

            // fresh > 0, so the buffer has a tail.
            let Some(last) = buffer.last() else { break };
            anchor = last.date;
            overlap = Some(anchor);
        }

        buffer.reverse();
        Series::from_chronological(buffer)
    }
}

fn push_descending(buffer: &mut Vec<TradingRecord>, record: TradingRecord, symbol: &str) -> Result<()> {
    if let Some(last) = buffer.last() {
        if record.date >= last.date {
            return Err(Error::SourceContract(format!(
                "records for {symbol} out of order: {} after {}",
                record.date, last.date
            )));
        }
    }
    buffer.push(record);
    Ok(())
}
