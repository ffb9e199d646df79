use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    cli::commands::{Cli, Commands},
    config::{AppConfig, DEFAULT_CONFIG_FILE, load_config_path},
    indicators::IndicatorTable,
    models::exchange::Exchange,
    providers::kis_rest::{KisProvider, SearchRange},
    screener::{Candidate, ScanOutcome, analyze, scan},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BandsOutput<'a> {
    symbol: &'a str,
    exchange: Exchange,
    length: usize,
    ref_date: Option<NaiveDate>,
    indicators: &'a IndicatorTable,
}

/// Loads `--config` when given, else `quote_analyzer.toml` if present, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => load_config_path(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_config_path(DEFAULT_CONFIG_FILE),
        None => {
            debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    let today = Local::now().date_naive();
    let provider = KisProvider::from_env(config.provider.clone()).context("failed to create KIS provider")?;

    match cli.command {
        Commands::Bands {
            symbol,
            exchange,
            size,
            ref_date,
        } => {
            let mut settings = config.scan_settings(today);
            if let Some(size) = size {
                settings.target_size = size;
            }
            if let Some(date) = ref_date {
                settings.reference_date = date;
            }

            let report = analyze(&provider, &symbol, exchange, &settings)
                .await
                .with_context(|| format!("analysis of {symbol}/{exchange} failed"))?;
            info!(container = %report.container, "bands computed");

            let output = BandsOutput {
                symbol: report.container.symbol(),
                exchange,
                length: report.container.len(),
                ref_date: report.container.reference_date(),
                indicators: &report.indicators,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Scan { exchange } => {
            let candidates = config.candidates(exchange)?;
            if candidates.is_empty() {
                bail!("no symbols configured; add a [symbols] table to the config file");
            }
            let outcomes = scan(&provider, candidates, &config.scan_settings(today)).await;
            print_outcomes(&outcomes)?;
        }

        Commands::Search {
            exchange,
            condition,
            min,
            max,
            analyze: analyze_hits,
        } => {
            if min > max {
                bail!("--min ({min}) must not exceed --max ({max})");
            }
            let hits = provider
                .search(exchange, &SearchRange::new(condition, min, max))
                .await
                .context("conditional search failed")?;
            let scope = exchange.map_or_else(|| "all".to_string(), |e| e.to_string());
            info!(hits = hits.len(), exchange = %scope, %condition, "search returned");

            if analyze_hits {
                let candidates: Vec<Candidate> = hits.into_iter().map(Candidate::from).collect();
                let outcomes = scan(&provider, candidates, &config.scan_settings(today)).await;
                print_outcomes(&outcomes)?;
            } else {
                for hit in &hits {
                    println!("{}", serde_json::to_string(hit)?);
                }
            }
        }

        Commands::Price { symbol, exchange } => {
            let price = provider
                .current_price(&symbol, exchange)
                .await
                .with_context(|| format!("price lookup for {symbol}/{exchange} failed"))?;
            println!("{price}");
        }
    }

    Ok(())
}

/// JSON lines on stdout, failures and the summary on stderr.
fn print_outcomes(outcomes: &[ScanOutcome]) -> Result<()> {
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                println!("{}", serde_json::to_string(&report.summary())?);
                succeeded += 1;
            }
            Err(e) => {
                eprintln!("ERROR: {} - {}", outcome.candidate.symbol, e);
                failed += 1;
            }
        }
    }

    // stderr keeps stdout machine-parsable
    eprintln!("SUMMARY: {succeeded} succeeded, {failed} failed");
    Ok(())
}
