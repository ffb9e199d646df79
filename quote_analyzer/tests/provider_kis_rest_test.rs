#![cfg(test)]
use chrono::{Duration, Local};
use quote_analyzer::{
    assembler::SeriesAssembler,
    models::exchange::Exchange,
    providers::{
        PageSource,
        kis_rest::{KisProvider, KisSettings, SearchCondition, SearchRange},
    },
};
use serial_test::serial;

fn live_provider() -> Option<KisProvider> {
    let _ = dotenvy::dotenv();
    if std::env::var("KIS_APP_KEY").is_err() || std::env::var("KIS_APP_SECRET").is_err() {
        println!("Skipping live KIS test: API keys not set.");
        return None;
    }
    Some(KisProvider::from_env(KisSettings::default()).expect("Failed to create KisProvider"))
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_kis_provider_fetch_page() {
    let Some(provider) = live_provider() else { return };
    let anchor = Local::now().date_naive() - Duration::days(1);

    let page = provider.fetch_page("AAPL", Exchange::Nas, anchor).await;
    assert!(page.is_ok(), "fetch_page returned an error: {:?}", page.err());

    let page = page.unwrap();
    assert!(!page.records.is_empty(), "Expected at least one record for AAPL");
    assert!(page.records[0].date <= anchor);
    assert!(page.records.windows(2).all(|w| w[0].date > w[1].date));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_kis_provider_assembles_across_pages() {
    let Some(provider) = live_provider() else { return };
    let reference = Local::now().date_naive();

    let series = SeriesAssembler::new(&provider)
        .assemble("MSFT", Exchange::Nas, reference, 150)
        .await
        .expect("assembly failed");
    assert_eq!(series.len(), 150);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_kis_provider_price_and_search() {
    let Some(provider) = live_provider() else { return };

    let price = provider.current_price("AAPL", Exchange::Nas).await.expect("price failed");
    assert!(price > 0.0);

    let hits = provider
        .search(Some(Exchange::Nas), &SearchRange::new(SearchCondition::Price, 100.0, 200.0))
        .await
        .expect("search failed");
    assert!(hits.iter().all(|h| h.exchange == Exchange::Nas));

    let everywhere = provider
        .search(None, &SearchRange::new(SearchCondition::Price, 100.0, 200.0))
        .await
        .expect("search across exchanges failed");
    assert!(everywhere.len() >= hits.len());
}
