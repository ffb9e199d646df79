use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::{models::exchange::Exchange, providers::kis_rest::SearchCondition};

#[derive(Parser)]
#[command(author, version, about = "Assemble daily quote history and compute Bollinger Bands")]
pub struct Cli {
    /// Path to the config file (quote_analyzer.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute Bollinger Bands for one symbol and print the table as JSON
    Bands {
        #[arg(long)]
        symbol: String,

        /// AMS, NAS or NYS
        #[arg(long)]
        exchange: Exchange,

        /// Number of sessions to assemble (overrides assembly.target_size)
        #[arg(long)]
        size: Option<usize>,

        /// Most recent session to include, e.g. "2024-06-28" (default: today)
        #[arg(long)]
        ref_date: Option<NaiveDate>,
    },

    /// Analyse every configured symbol, one JSON line per success
    Scan {
        /// Only scan symbols listed under this exchange
        #[arg(long)]
        exchange: Option<Exchange>,
    },

    /// Run a conditional search
    Search {
        /// Restrict the search to one exchange (default: AMS, NAS and NYS)
        #[arg(long)]
        exchange: Option<Exchange>,

        #[arg(long, value_enum)]
        condition: SearchCondition,

        #[arg(long)]
        min: f64,

        #[arg(long)]
        max: f64,

        /// Analyse every hit instead of just listing it
        #[arg(long)]
        analyze: bool,
    },

    /// Print the last traded price
    Price {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        exchange: Exchange,
    },
}
