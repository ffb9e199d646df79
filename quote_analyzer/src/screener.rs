//! Runs the assemble, contain and compute pipeline over a list of candidates.
//!
//! A failure for one candidate is recorded in its [`ScanOutcome`] and the scan
//! moves on to the next one.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    assembler::{ExhaustionPolicy, SeriesAssembler},
    container::{ContainerPolicy, SeriesContainer},
    errors::{Error, Result},
    indicators::{BollingerSettings, IndicatorPoint, IndicatorTable},
    models::exchange::Exchange,
    providers::{PageSource, kis_rest::SearchHit},
};

/// A security to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub symbol: String,
    pub exchange: Exchange,
}

impl Candidate {
    pub fn new(symbol: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
        }
    }
}

impl From<SearchHit> for Candidate {
    fn from(hit: SearchHit) -> Self {
        Self {
            symbol: hit.symbol,
            exchange: hit.exchange,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub reference_date: NaiveDate,
    pub target_size: usize,
    pub exhaustion: ExhaustionPolicy,
    pub container: ContainerPolicy,
    pub bollinger: BollingerSettings,
}

impl ScanSettings {
    /// Defaults for every knob except the reference date.
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            target_size: 100,
            exhaustion: ExhaustionPolicy::default(),
            container: ContainerPolicy::default(),
            bollinger: BollingerSettings::default(),
        }
    }
}

/// One analysed security.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub container: SeriesContainer,
    pub indicators: IndicatorTable,
}

impl ScanReport {
    /// Most recent indicator point, if the window produced any.
    pub fn latest(&self) -> Option<IndicatorPoint> {
        self.indicators.last()
    }

    pub fn summary(&self) -> ScanSummary<'_> {
        ScanSummary {
            symbol: self.container.symbol(),
            exchange: self.container.exchange(),
            length: self.container.len(),
            ref_date: self.container.reference_date(),
            latest_date: self.container.latest_date(),
            latest: self.latest(),
        }
    }
}

/// Serializable one-line view of a [`ScanReport`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary<'a> {
    pub symbol: &'a str,
    pub exchange: Exchange,
    pub length: usize,
    pub ref_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub latest: Option<IndicatorPoint>,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub candidate: Candidate,
    pub result: Result<ScanReport>,
}

/// Assembles, validates and analyses a single security.
pub async fn analyze<S: PageSource + ?Sized>(
    source: &S,
    symbol: &str,
    exchange: Exchange,
    settings: &ScanSettings,
) -> Result<ScanReport> {
    let series = SeriesAssembler::new(source)
        .with_policy(settings.exhaustion)
        .assemble(symbol, exchange, settings.reference_date, settings.target_size)
        .await?;
    let container = SeriesContainer::from_series(symbol, exchange, series, &settings.container)?;
    let indicators = container.compute_indicators(&settings.bollinger)?;
    debug!(%container, points = indicators.len(), "analysed");
    Ok(ScanReport {
        container,
        indicators,
    })
}

/// Analyses every candidate in order. Never fails as a whole.
pub async fn scan<S, I>(source: &S, candidates: I, settings: &ScanSettings) -> Vec<ScanOutcome>
where
    S: PageSource + ?Sized,
    I: IntoIterator<Item = Candidate>,
{
    let mut outcomes = Vec::new();
    for candidate in candidates {
        let result = analyze(source, &candidate.symbol, candidate.exchange, settings).await;
        match &result {
            Ok(_) => {}
            Err(e @ Error::InsufficientData { .. }) => {
                warn!(symbol = %candidate.symbol, exchange = %candidate.exchange, error = %e, "skipping short history");
            }
            Err(e) => {
                error!(symbol = %candidate.symbol, exchange = %candidate.exchange, error = %e, "analysis failed");
            }
        }
        outcomes.push(ScanOutcome { candidate, result });
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(total = outcomes.len(), failed, "scan finished");
    outcomes
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::{
        models::record::{Page, TradingRecord},
        providers::ProviderError,
    };

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(offset)
    }

    /// Every symbol has `depth` sessions ending at the anchor, served in one page.
    struct Flat {
        depth: usize,
    }

    #[async_trait]
    impl PageSource for Flat {
        async fn fetch_page(&self, symbol: &str, _: Exchange, anchor: NaiveDate) -> Result<Page, ProviderError> {
            let depth = if symbol == "SHORT" { 5 } else { self.depth };
            let records = (0..depth as i64)
                .map(|i| TradingRecord {
                    date: anchor - Duration::days(i),
                    price: 10.0 + (i % 3) as f64,
                    low: 9.0,
                    high: 13.0,
                    volume: 100.0,
                    amount: 1_000.0,
                })
                .collect();
            Ok(Page::exhausted(records))
        }
    }

    #[tokio::test]
    async fn short_history_does_not_abort_the_scan() {
        let settings = ScanSettings {
            target_size: 30,
            ..ScanSettings::new(day(60))
        };
        let candidates = vec![
            Candidate::new("AAPL", Exchange::Nas),
            Candidate::new("SHORT", Exchange::Ams),
            Candidate::new("IBM", Exchange::Nys),
        ];

        let outcomes = scan(&Flat { depth: 40 }, candidates, &settings).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(Error::InsufficientData { available: 5, .. })
        ));
        let ibm = outcomes[2].result.as_ref().unwrap();
        assert_eq!(ibm.container.len(), 30);
        assert_eq!(ibm.indicators.len(), 11);
    }

    #[tokio::test]
    async fn summary_points_at_latest_session() {
        let settings = ScanSettings {
            target_size: 25,
            ..ScanSettings::new(day(60))
        };
        let report = analyze(&Flat { depth: 40 }, "AAPL", Exchange::Nas, &settings)
            .await
            .unwrap();

        let summary = report.summary();
        assert_eq!(summary.length, 25);
        assert_eq!(summary.ref_date, Some(day(36)));
        assert_eq!(summary.latest_date, Some(day(60)));
        assert_eq!(summary.latest.map(|p| p.date), Some(day(60)));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["exchange"], "NAS");
        assert_eq!(json["refDate"], "2024-04-06");
    }

    #[tokio::test]
    async fn container_policy_applies_to_best_effort_results() {
        let settings = ScanSettings {
            target_size: 30,
            exhaustion: ExhaustionPolicy::BestEffort,
            container: ContainerPolicy { min_length: Some(20) },
            ..ScanSettings::new(day(60))
        };
        let err = analyze(&Flat { depth: 40 }, "SHORT", Exchange::Ams, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
