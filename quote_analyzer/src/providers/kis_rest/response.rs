use serde::Deserialize;
use shared_utils::dates::parse_compact_date;
use snafu::OptionExt;

use crate::{
    models::record::{Page, TradingRecord},
    providers::{ApiSnafu, DecodeSnafu, ProviderError},
};

/// Status fields every API response carries next to its payload.
#[derive(Deserialize, Debug, Default)]
pub struct ResponseStatus {
    /// `"0"` on success.
    pub rt_cd: Option<String>,
    #[serde(default)]
    pub msg_cd: String,
    #[serde(default)]
    pub msg1: String,
}

impl ResponseStatus {
    pub fn check(&self) -> Result<(), ProviderError> {
        match self.rt_cd.as_deref() {
            None | Some("0") => Ok(()),
            Some(_) => ApiSnafu {
                code: self.msg_cd.trim(),
                message: self.msg1.trim(),
            }
            .fail(),
        }
    }
}

/// Implemented by every response body so the request helper can check status generically.
pub trait KisResponse {
    fn status(&self) -> &ResponseStatus;
}

#[derive(Deserialize, Debug)]
pub struct DailyPriceRow {
    #[serde(default)]
    pub xymd: String,
    #[serde(default)]
    pub clos: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub tvol: String,
    #[serde(default)]
    pub tamt: String,
}

#[derive(Deserialize, Debug)]
pub struct DailyPriceResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub output2: Vec<DailyPriceRow>,
}

impl KisResponse for DailyPriceResponse {
    fn status(&self) -> &ResponseStatus {
        &self.status
    }
}

impl DailyPriceResponse {
    /// Converts rows into a page. A row without a closing price marks the
    /// start of the security's history; nothing after it is read.
    pub fn into_page(self) -> Result<Page, ProviderError> {
        let mut records = Vec::with_capacity(self.output2.len());
        for row in self.output2 {
            if row.clos.trim().is_empty() {
                return Ok(Page::exhausted(records));
            }
            records.push(row.into_record()?);
        }
        Ok(Page::new(records))
    }
}

impl DailyPriceRow {
    fn into_record(self) -> Result<TradingRecord, ProviderError> {
        let date = parse_compact_date(&self.xymd).map_err(|e| {
            DecodeSnafu {
                message: e.to_string(),
            }
            .build()
        })?;
        Ok(TradingRecord {
            date,
            price: parse_number("clos", &self.clos)?,
            low: parse_number("low", &self.low)?,
            high: parse_number("high", &self.high)?,
            volume: parse_number("tvol", &self.tvol)?,
            amount: parse_number("tamt", &self.tamt)?,
        })
    }
}

pub(crate) fn parse_number(field: &str, value: &str) -> Result<f64, ProviderError> {
    value.trim().parse::<f64>().ok().context(DecodeSnafu {
        message: format!("field {field} = '{value}' is not a number"),
    })
}

#[derive(Deserialize, Debug)]
pub struct PriceOutput {
    #[serde(default)]
    pub last: String,
}

#[derive(Deserialize, Debug)]
pub struct PriceResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    pub output: PriceOutput,
}

impl KisResponse for PriceResponse {
    fn status(&self) -> &ResponseStatus {
        &self.status
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchRow {
    #[serde(default)]
    pub excd: String,
    #[serde(default)]
    pub symb: String,
}

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub output2: Vec<SearchRow>,
}

impl KisResponse for SearchResponse {
    fn status(&self) -> &ResponseStatus {
        &self.status
    }
}

#[derive(Deserialize, Debug)]
pub struct DayOrNightOutput {
    #[serde(rename = "PSBL_YN")]
    pub psbl_yn: String,
}

#[derive(Deserialize, Debug)]
pub struct DayOrNightResponse {
    #[serde(flatten)]
    pub status: ResponseStatus,
    pub output: DayOrNightOutput,
}

impl KisResponse for DayOrNightResponse {
    fn status(&self) -> &ResponseStatus {
        &self.status
    }
}

impl DayOrNightResponse {
    /// `PSBL_YN == "N"` while the US daytime session is the active one.
    pub fn is_daytime(&self) -> bool {
        self.output.psbl_yn.trim().eq_ignore_ascii_case("N")
    }
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    /// `%Y-%m-%d %H:%M:%S`, Korea Standard Time.
    pub access_token_token_expired: String,
}
