use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown exchange code: {0}")]
pub struct ExchangeParseError(pub String);

/// US exchanges served by the overseas quote API.
///
/// Assembled data always carries the regular code. The daytime-session codes
/// only exist on the wire, see [`Exchange::daytime_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// NYSE American
    Ams,
    /// Nasdaq
    Nas,
    /// New York Stock Exchange
    Nys,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Ams, Exchange::Nas, Exchange::Nys];

    pub const fn code(self) -> &'static str {
        match self {
            Exchange::Ams => "AMS",
            Exchange::Nas => "NAS",
            Exchange::Nys => "NYS",
        }
    }

    /// Code used for requests while the US daytime session is open.
    pub const fn daytime_code(self) -> &'static str {
        match self {
            Exchange::Ams => "BAA",
            Exchange::Nas => "BAQ",
            Exchange::Nys => "BAY",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Exchange {
    type Err = ExchangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AMS" | "BAA" => Ok(Exchange::Ams),
            "NAS" | "BAQ" => Ok(Exchange::Nas),
            "NYS" | "BAY" => Ok(Exchange::Nys),
            _ => Err(ExchangeParseError(s.to_string())),
        }
    }
}
