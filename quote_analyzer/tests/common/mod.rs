#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use quote_analyzer::{
    models::{
        exchange::Exchange,
        record::{Page, TradingRecord},
    },
    providers::{PageSource, ProviderError},
};

/// Weekdays from `start`, `count` of them.
pub fn sessions(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut d = start;
    while out.len() < count {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d += Duration::days(1);
    }
    out
}

/// A vendor that keeps a fixed history and serves it newest first in pages
/// of `page_size`, each page starting at the anchor (or the session before it).
pub struct PagedHistory {
    history: Vec<TradingRecord>,
    page_size: usize,
    calls: AtomicUsize,
}

impl PagedHistory {
    pub fn new(start: NaiveDate, count: usize, page_size: usize) -> Self {
        let prices = (0..count).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        Self::with_prices(start, prices, page_size)
    }

    pub fn with_prices(start: NaiveDate, prices: Vec<f64>, page_size: usize) -> Self {
        let history = sessions(start, prices.len())
            .into_iter()
            .zip(prices)
            .map(|(date, price)| TradingRecord {
                date,
                price,
                low: price - 1.0,
                high: price + 1.0,
                volume: 1_000.0,
                amount: price * 1_000.0,
            })
            .collect();
        Self {
            history,
            page_size,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_session(&self) -> NaiveDate {
        self.history.last().map(|r| r.date).unwrap()
    }
}

#[async_trait]
impl PageSource for PagedHistory {
    async fn fetch_page(&self, _symbol: &str, _exchange: Exchange, anchor: NaiveDate) -> Result<Page, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let end = self.history.partition_point(|r| r.date <= anchor);
        let start = end.saturating_sub(self.page_size);
        let records = self.history[start..end].iter().rev().cloned().collect();

        Ok(if start == 0 {
            Page::exhausted(records)
        } else {
            Page::new(records)
        })
    }
}
