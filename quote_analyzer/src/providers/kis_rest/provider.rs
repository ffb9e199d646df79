use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use shared_utils::env::get_optional_env_var;
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    models::{exchange::Exchange, record::Page},
    providers::{
        ClientBuildSnafu, DecodeSnafu, HttpSnafu, InvalidBaseUrlSnafu, InvalidCredentialSnafu, PageSource, ProviderError,
        ProviderInitError, ReqwestSnafu,
        kis_rest::{
            auth::{AppCredentials, KisAuth, TokenProvider},
            params::{
                CUSTOMER_TYPE_PERSONAL, DAILY_PRICE_PATH, DAILY_PRICE_TR_ID, DAY_OR_NIGHT_PATH,
                DAY_OR_NIGHT_TR_ID, PRICE_PATH, PRICE_TR_ID, Query, SEARCH_PATH, SEARCH_TR_ID,
                SearchRange, daily_price_query, price_query, search_query,
            },
            response::{
                DailyPriceResponse, DayOrNightResponse, KisResponse, PriceResponse, SearchResponse,
                parse_number,
            },
            session::{SessionMode, SessionResolver},
        },
    },
};

pub const REAL_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
/// Overrides [`KisSettings::base_url`], e.g. to point at the paper-trading domain.
pub const BASE_URL_VAR: &str = "KIS_BASE_URL";

/// Provider knobs, usually read from the `[provider]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KisSettings {
    pub base_url: String,
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub session: SessionMode,
    /// Request split/dividend adjusted prices.
    pub adjusted_prices: bool,
}

impl Default for KisSettings {
    fn default() -> Self {
        Self {
            base_url: REAL_BASE_URL.to_string(),
            requests_per_second: 20,
            max_retries: 3,
            base_delay_ms: 500,
            session: SessionMode::Auto,
            adjusted_prices: false,
        }
    }
}

/// A symbol returned by a conditional search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub symbol: String,
    pub exchange: Exchange,
}

pub struct KisProvider {
    client: Client,
    base_url: String,
    auth: Arc<dyn TokenProvider>,
    limiter: DefaultDirectRateLimiter,
    session: SessionResolver,
    max_retries: u32,
    base_delay: Duration,
    adjusted: bool,
}

impl KisProvider {
    /// Creates a provider from `KIS_APP_KEY` / `KIS_APP_SECRET`, honouring a
    /// `KIS_BASE_URL` override.
    pub fn from_env(mut settings: KisSettings) -> Result<Self, ProviderInitError> {
        if let Some(url) = get_optional_env_var(BASE_URL_VAR) {
            settings.base_url = url;
        }
        Self::new(settings, AppCredentials::from_env()?)
    }

    /// Creates a provider that issues its own tokens with [`KisAuth`].
    pub fn new(settings: KisSettings, credentials: AppCredentials) -> Result<Self, ProviderInitError> {
        let client = build_client(&credentials)?;
        let auth = Arc::new(KisAuth::new(client.clone(), &settings.base_url, credentials));
        Self::assemble(settings, client, auth)
    }

    /// Creates a provider around an externally managed token source.
    pub fn with_token_provider(
        settings: KisSettings,
        credentials: &AppCredentials,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self, ProviderInitError> {
        let client = build_client(credentials)?;
        Self::assemble(settings, client, auth)
    }

    fn assemble(
        settings: KisSettings,
        client: Client,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self, ProviderInitError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if let Err(e) = reqwest::Url::parse(&base_url) {
            return InvalidBaseUrlSnafu {
                url: base_url,
                message: e.to_string(),
            }
            .fail();
        }

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(nonzero!(1u32));

        Ok(Self {
            client,
            base_url,
            auth,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            session: SessionResolver::new(settings.session),
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            adjusted: settings.adjusted_prices,
        })
    }

    /// Last traded price.
    pub async fn current_price(&self, symbol: &str, exchange: Exchange) -> Result<f64, ProviderError> {
        let excd = self.wire_exchange(exchange).await?;
        let body: PriceResponse = self
            .get_json(PRICE_PATH, PRICE_TR_ID, &price_query(excd, symbol), &[])
            .await?;
        parse_number("last", &body.output.last)
    }

    /// Symbols whose condition value falls inside `range`, on one exchange or,
    /// when `only` is `None`, on every supported exchange in turn.
    pub async fn search(&self, only: Option<Exchange>, range: &SearchRange) -> Result<Vec<SearchHit>, ProviderError> {
        let mut hits: Vec<SearchHit> = Vec::new();
        for exchange in search_targets(only) {
            for hit in self.search_exchange(exchange, range).await? {
                if !hits.contains(&hit) {
                    hits.push(hit);
                }
            }
        }
        Ok(hits)
    }

    async fn search_exchange(&self, exchange: Exchange, range: &SearchRange) -> Result<Vec<SearchHit>, ProviderError> {
        let body: SearchResponse = self
            .get_json(
                SEARCH_PATH,
                SEARCH_TR_ID,
                &search_query(exchange.code(), range),
                &[("custtype", CUSTOMER_TYPE_PERSONAL)],
            )
            .await?;

        let mut hits = Vec::with_capacity(body.output2.len());
        for row in body.output2 {
            let symbol = row.symb.trim();
            if symbol.is_empty() {
                continue;
            }
            match row.excd.parse::<Exchange>() {
                Ok(exchange) => hits.push(SearchHit {
                    symbol: symbol.to_string(),
                    exchange,
                }),
                Err(e) => warn!(symbol, error = %e, "skipping search hit on unsupported exchange"),
            }
        }
        debug!(%exchange, condition = %range.condition, hits = hits.len(), "conditional search finished");
        Ok(hits)
    }

    async fn is_daytime(&self) -> Result<bool, ProviderError> {
        let body: DayOrNightResponse = self
            .get_json(DAY_OR_NIGHT_PATH, DAY_OR_NIGHT_TR_ID, &Vec::new(), &[])
            .await?;
        Ok(body.is_daytime())
    }

    async fn wire_exchange(&self, exchange: Exchange) -> Result<&'static str, ProviderError> {
        self.session.resolve(exchange, || self.is_daytime()).await
    }

    /// GET with rate limiting and retry on transient failures.
    async fn get_json<T>(
        &self,
        path: &str,
        tr_id: &str,
        query: &Query,
        extra_headers: &[(&'static str, &'static str)],
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + KisResponse,
    {
        let mut attempt = 0u32;
        loop {
            match self.try_get_json::<T>(path, tr_id, query, extra_headers).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.base_delay.saturating_mul(1 << attempt.min(16));
                    warn!(
                        path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying quote request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get_json<T>(
        &self,
        path: &str,
        tr_id: &str,
        query: &Query,
        extra_headers: &[(&'static str, &'static str)],
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + KisResponse,
    {
        self.limiter.until_ready().await;
        let token = self.auth.access_token().await?;

        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token.expose_secret())
            .header("tr_id", tr_id)
            .query(query);
        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.context(ReqwestSnafu)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return HttpSnafu {
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let body = response.json::<T>().await.context(ReqwestSnafu)?;
        body.status().check()?;
        Ok(body)
    }
}

/// Exchanges a conditional search covers.
pub fn search_targets(only: Option<Exchange>) -> Vec<Exchange> {
    match only {
        Some(exchange) => vec![exchange],
        None => Exchange::ALL.to_vec(),
    }
}

fn build_client(credentials: &AppCredentials) -> Result<Client, ProviderInitError> {
    let mut headers = header::HeaderMap::new();
    for (name, secret) in [
        ("appkey", &credentials.app_key),
        ("appsecret", &credentials.app_secret),
    ] {
        let mut value = match header::HeaderValue::from_str(secret.expose_secret()) {
            Ok(value) => value,
            Err(e) => {
                return InvalidCredentialSnafu {
                    header: name,
                    message: e.to_string(),
                }
                .fail();
            }
        };
        value.set_sensitive(true);
        headers.insert(name, value);
    }

    Client::builder()
        .default_headers(headers)
        .build()
        .context(ClientBuildSnafu)
}

#[async_trait]
impl PageSource for KisProvider {
    async fn fetch_page(
        &self,
        symbol: &str,
        exchange: Exchange,
        anchor: NaiveDate,
    ) -> Result<Page, ProviderError> {
        let excd = self.wire_exchange(exchange).await?;
        let query = daily_price_query(excd, symbol, anchor, self.adjusted);
        let body: DailyPriceResponse = self
            .get_json(DAILY_PRICE_PATH, DAILY_PRICE_TR_ID, &query, &[])
            .await?;

        let page = body.into_page()?;
        if page.records.first().is_some_and(|r| r.date > anchor) {
            return DecodeSnafu {
                message: format!("page for {symbol} anchored at {anchor} starts after the anchor"),
            }
            .fail();
        }
        debug!(
            symbol,
            %exchange,
            %anchor,
            records = page.records.len(),
            exhausted = page.exhausted,
            "fetched daily price page"
        );
        Ok(page)
    }
}
