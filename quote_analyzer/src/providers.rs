//! Page source abstraction for historical quote data.
//!
//! This module defines the [`PageSource`] trait, the interface the
//! [`assembler`](crate::assembler) pulls pages through. A page source answers
//! one question: "give me the page of daily records ending at this anchor
//! date". It owns transport, authentication, session translation and rate
//! limiting. The assembler treats each call as one opaque awaited operation.
//!
//! The trait supports dynamic dispatch (`dyn PageSource`) so the CLI and tests
//! can swap the REST provider for a scripted one.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use chrono::NaiveDate;
//! use quote_analyzer::models::{exchange::Exchange, record::Page};
//! use quote_analyzer::providers::{PageSource, ProviderError};
//!
//! struct NoHistory;
//!
//! #[async_trait]
//! impl PageSource for NoHistory {
//!     async fn fetch_page(
//!         &self,
//!         _symbol: &str,
//!         _exchange: Exchange,
//!         _anchor: NaiveDate,
//!     ) -> Result<Page, ProviderError> {
//!         Ok(Page::exhausted(vec![]))
//!     }
//! }
//! ```

pub mod kis_rest;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{exchange::Exchange, record::Page};

/// Message code the quote API uses for "too many requests per second".
pub const RATE_LIMIT_MESSAGE_CODE: &str = "EGW00201";

/// Trait for fetching one page of daily history from a quote source.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page of records ending at `anchor`, most recent first.
    ///
    /// The record dated `anchor` (if it was a trading day) is the first
    /// record of the page. A page that ran into the beginning of the
    /// security's history sets [`Page::exhausted`].
    async fn fetch_page(
        &self,
        symbol: &str,
        exchange: Exchange,
        anchor: NaiveDate,
    ) -> Result<Page, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// An application key or secret cannot be sent as a header value.
    #[snafu(display("Invalid credential for header '{header}': {message}"))]
    InvalidCredential {
        header: String,
        message: String,
        backtrace: Backtrace,
    },

    /// The configured base URL cannot be parsed.
    #[snafu(display("Invalid base URL '{url}': {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `PageSource` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The server answered with a non-success HTTP status.
    #[snafu(display("HTTP {status}: {body}"))]
    Http {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The API accepted the request but reported a failure in the body.
    #[snafu(display("API error {code}: {message}"))]
    Api {
        code: String,
        message: String,
        backtrace: Backtrace,
    },

    /// A field in the response could not be interpreted.
    #[snafu(display("Malformed response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// No access token could be obtained.
    #[snafu(display("Authentication failed: {message}"))]
    Auth {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Api { code, .. } => code == RATE_LIMIT_MESSAGE_CODE,
            _ => false,
        }
    }
}
