use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_utils::dates::format_compact_date;

pub const TOKEN_PATH: &str = "/oauth2/tokenP";

pub const DAILY_PRICE_PATH: &str = "/uapi/overseas-price/v1/quotations/dailyprice";
pub const DAILY_PRICE_TR_ID: &str = "HHDFS76240000";

pub const PRICE_PATH: &str = "/uapi/overseas-price/v1/quotations/price";
pub const PRICE_TR_ID: &str = "HHDFS00000300";

pub const SEARCH_PATH: &str = "/uapi/overseas-price/v1/quotations/inquire-search";
pub const SEARCH_TR_ID: &str = "HHDFS76410000";

pub const DAY_OR_NIGHT_PATH: &str = "/uapi/overseas-stock/v1/trading/dayornight";
pub const DAY_OR_NIGHT_TR_ID: &str = "JTTT3010R";

/// Personal (as opposed to corporate) customer type, required by the search endpoint.
pub const CUSTOMER_TYPE_PERSONAL: &str = "P";

pub type Query = Vec<(String, String)>;

fn pair(k: &str, v: impl Into<String>) -> (String, String) {
    (k.to_string(), v.into())
}

/// Daily bars ending at `anchor`, most recent first.
pub fn daily_price_query(wire_exchange: &str, symbol: &str, anchor: NaiveDate, adjusted: bool) -> Query {
    vec![
        pair("AUTH", ""),
        pair("EXCD", wire_exchange),
        pair("SYMB", symbol),
        // 0: daily, 1: weekly, 2: monthly
        pair("GUBN", "0"),
        pair("BYMD", format_compact_date(anchor)),
        pair("MODP", if adjusted { "1" } else { "0" }),
    ]
}

pub fn price_query(wire_exchange: &str, symbol: &str) -> Query {
    vec![pair("AUTH", ""), pair("EXCD", wire_exchange), pair("SYMB", symbol)]
}

/// Field a conditional search can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SearchCondition {
    /// Current price
    Price,
    /// Daily change, percent
    FluctuationRate,
    /// Shares traded
    Volume,
    /// Traded value
    TradedValue,
    /// Price / earnings
    Per,
    /// Earnings per share
    Eps,
    /// Shares outstanding
    SharesOutstanding,
    /// Market capitalisation
    MarketCap,
}

impl SearchCondition {
    /// Suffix of the `CO_YN_*` / `CO_ST_*` / `CO_EN_*` query keys.
    pub const fn key(self) -> &'static str {
        match self {
            SearchCondition::Price => "PRICECUR",
            SearchCondition::FluctuationRate => "RATE",
            SearchCondition::Volume => "VOLUME",
            SearchCondition::TradedValue => "AMT",
            SearchCondition::Per => "PER",
            SearchCondition::Eps => "EPS",
            SearchCondition::SharesOutstanding => "SHAR",
            SearchCondition::MarketCap => "VALX",
        }
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SearchCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "price" => Ok(SearchCondition::Price),
            "fluctuation_rate" | "rate" => Ok(SearchCondition::FluctuationRate),
            "volume" => Ok(SearchCondition::Volume),
            "traded_value" | "amount" => Ok(SearchCondition::TradedValue),
            "per" => Ok(SearchCondition::Per),
            "eps" => Ok(SearchCondition::Eps),
            "shares_outstanding" | "shares" => Ok(SearchCondition::SharesOutstanding),
            "market_cap" => Ok(SearchCondition::MarketCap),
            other => Err(format!("unknown search condition: {other}")),
        }
    }
}

/// Inclusive `[min, max]` range on one condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRange {
    pub condition: SearchCondition,
    pub min: f64,
    pub max: f64,
}

impl SearchRange {
    pub fn new(condition: SearchCondition, min: f64, max: f64) -> Self {
        Self { condition, min, max }
    }
}

/// Search queries always use the regular exchange code.
pub fn search_query(exchange_code: &str, range: &SearchRange) -> Query {
    let key = range.condition.key();
    vec![
        pair("AUTH", ""),
        pair("EXCD", exchange_code),
        pair(&format!("CO_YN_{key}"), "1"),
        pair(&format!("CO_ST_{key}"), range.min.to_string()),
        pair(&format!("CO_EN_{key}"), range.max.to_string()),
    ]
}
