//! TOML configuration for the analyzer binary.
//!
//! Every table and key is optional; a missing file section means defaults.
//! Unknown keys are rejected so a typo never silently falls back to a default.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]

use std::path::Path;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    assembler::ExhaustionPolicy,
    container::ContainerPolicy,
    indicators::BollingerSettings,
    models::exchange::Exchange,
    providers::kis_rest::KisSettings,
    screener::{Candidate, ScanSettings},
};

/// Default file name looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "quote_analyzer.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblySettings {
    pub target_size: usize,
    pub exhaustion: ExhaustionPolicy,
    /// Most recent session to include. Defaults to today when absent.
    pub reference_date: Option<NaiveDate>,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            target_size: 100,
            exhaustion: ExhaustionPolicy::default(),
            reference_date: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub assembly: AssemblySettings,
    pub container: ContainerPolicy,
    pub bollinger: BollingerSettings,
    pub provider: KisSettings,
    /// Exchange code -> symbols to scan. Keys are validated by [`load_config_str`].
    pub symbols: IndexMap<String, Vec<String>>,
}

impl AppConfig {
    /// Scan settings anchored at `reference_date`, or the configured date if set.
    pub fn scan_settings(&self, fallback_date: NaiveDate) -> ScanSettings {
        ScanSettings {
            reference_date: self.assembly.reference_date.unwrap_or(fallback_date),
            target_size: self.assembly.target_size,
            exhaustion: self.assembly.exhaustion,
            container: self.container,
            bollinger: self.bollinger,
        }
    }

    /// Configured symbols in file order, optionally restricted to one exchange.
    pub fn candidates(&self, only: Option<Exchange>) -> anyhow::Result<Vec<Candidate>> {
        let mut out = Vec::new();
        for (code, symbols) in &self.symbols {
            let exchange: Exchange = code
                .parse()
                .with_context(|| format!("symbols table has unknown exchange '{code}'"))?;
            if only.is_some_and(|e| e != exchange) {
                continue;
            }
            out.extend(symbols.iter().map(|s| Candidate::new(s.clone(), exchange)));
        }
        Ok(out)
    }
}

/// Trims symbol names, drops blanks and duplicates (first occurrence wins),
/// and checks every exchange key.
fn normalize(cfg: &mut AppConfig) -> anyhow::Result<()> {
    let old = std::mem::take(&mut cfg.symbols);
    let mut rebuilt: IndexMap<String, Vec<String>> = IndexMap::new();

    for (raw_code, symbols) in old {
        let exchange: Exchange = raw_code
            .parse()
            .with_context(|| format!("symbols table has unknown exchange '{raw_code}'"))?;
        let code = exchange.code().to_string();
        if rebuilt.contains_key(&code) {
            bail!("exchange {code} listed twice in symbols table");
        }

        let mut cleaned: Vec<String> = Vec::with_capacity(symbols.len());
        for s in symbols {
            let s = s.trim().to_uppercase();
            if !s.is_empty() && !cleaned.contains(&s) {
                cleaned.push(s);
            }
        }
        rebuilt.insert(code, cleaned);
    }

    cfg.symbols = rebuilt;
    Ok(())
}

/// Parse a configuration TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let mut cfg: AppConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    normalize(&mut cfg).context("invalid symbols table")?;
    Ok(cfg)
}

/// Read a configuration file from disk and parse it.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}
