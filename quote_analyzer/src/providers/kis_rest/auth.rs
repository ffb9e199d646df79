//! Access-token lifecycle.
//!
//! The provider never reaches for a global credential object. It is handed a
//! [`TokenProvider`] and asks it for a bearer token before each request.
//! [`KisAuth`] is the production implementation: it issues a token, caches it
//! until its published expiry, and issues a new one afterwards.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::providers::{
    AuthSnafu, HttpSnafu, MissingEnvVarSnafu, ProviderError, ProviderInitError, ReqwestSnafu,
    kis_rest::{params::TOKEN_PATH, response::TokenResponse},
};

/// Environment variable holding the application key.
pub const APP_KEY_VAR: &str = "KIS_APP_KEY";
/// Environment variable holding the application secret.
pub const APP_SECRET_VAR: &str = "KIS_APP_SECRET";

const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Token expiry is published in Korea Standard Time.
const KST_OFFSET_HOURS: i64 = 9;
/// Refresh slightly early so a token never expires mid-request.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies a valid bearer token, refreshing it as needed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, ProviderError>;
}

/// Application key pair issued by the broker.
pub struct AppCredentials {
    pub app_key: SecretString,
    pub app_secret: SecretString,
}

impl AppCredentials {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        let (app_key, app_secret): (String, String) = (app_key.into(), app_secret.into());
        Self {
            app_key: SecretString::new(app_key.into_boxed_str()),
            app_secret: SecretString::new(app_secret.into_boxed_str()),
        }
    }

    /// Reads the key pair from `KIS_APP_KEY` and `KIS_APP_SECRET`.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let app_key = get_env_var(APP_KEY_VAR).context(MissingEnvVarSnafu)?;
        let app_secret = get_env_var(APP_SECRET_VAR).context(MissingEnvVarSnafu)?;
        Ok(Self::new(app_key, app_secret))
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    appkey: &'a str,
    appsecret: &'a str,
}

struct AccessToken {
    value: SecretString,
    expires_at: NaiveDateTime,
}

impl AccessToken {
    fn is_fresh(&self, now_kst: NaiveDateTime) -> bool {
        now_kst + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

fn now_kst() -> NaiveDateTime {
    Utc::now().naive_utc() + TimeDelta::hours(KST_OFFSET_HOURS)
}

pub(crate) fn parse_expiry(raw: &str) -> Result<NaiveDateTime, ProviderError> {
    NaiveDateTime::parse_from_str(raw.trim(), EXPIRY_FORMAT).map_err(|e| {
        AuthSnafu {
            message: format!("unreadable token expiry '{raw}': {e}"),
        }
        .build()
    })
}

/// Client-credentials token issuer with an in-memory cache.
pub struct KisAuth {
    client: Client,
    token_url: String,
    credentials: AppCredentials,
    cached: Mutex<Option<AccessToken>>,
}

impl KisAuth {
    pub fn new(client: Client, base_url: &str, credentials: AppCredentials) -> Self {
        Self {
            client,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TOKEN_PATH),
            credentials,
            cached: Mutex::new(None),
        }
    }

    async fn issue(&self) -> Result<AccessToken, ProviderError> {
        let body = TokenRequest {
            grant_type: "client_credentials",
            appkey: self.credentials.app_key.expose_secret(),
            appsecret: self.credentials.app_secret.expose_secret(),
        };

        let response = self
            .client
            .post(&self.token_url)
            .json(&body)
            .send()
            .await
            .context(ReqwestSnafu)?;

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

        let token = response.json::<TokenResponse>().await.context(ReqwestSnafu)?;
        Ok(AccessToken {
            expires_at: parse_expiry(&token.access_token_token_expired)?,
            value: SecretString::new(token.access_token.into()),
        })
    }
}

#[async_trait]
impl TokenProvider for KisAuth {
    async fn access_token(&self) -> Result<SecretString, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now_kst()) {
                return Ok(SecretString::new(token.value.expose_secret().into()));
            }
        }

        let replacing = cached.is_some();
        let token = self.issue().await?;
        if replacing {
            info!(expires_at = %token.expires_at, "access token expired, issued a new one");
        } else {
            debug!(expires_at = %token.expires_at, "issued access token");
        }

        let value = SecretString::new(token.value.expose_secret().into());
        *cached = Some(token);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_parses_published_format() {
        let at = parse_expiry("2024-01-06 10:00:00").unwrap();
        assert_eq!(at.to_string(), "2024-01-06 10:00:00");
        assert!(matches!(parse_expiry("tomorrow"), Err(ProviderError::Auth { .. })));
    }

    #[test]
    fn token_goes_stale_inside_margin() {
        let expires_at = parse_expiry("2024-01-06 10:00:00").unwrap();
        let token = AccessToken {
            value: SecretString::new("t".into()),
            expires_at,
        };
        assert!(token.is_fresh(expires_at - TimeDelta::minutes(5)));
        assert!(!token.is_fresh(expires_at - TimeDelta::seconds(30)));
        assert!(!token.is_fresh(expires_at + TimeDelta::seconds(1)));
    }

    #[test]
    fn credentials_keep_values() {
        let creds = AppCredentials::new("key", "secret");
        assert_eq!(creds.app_key.expose_secret(), "key");
        assert_eq!(creds.app_secret.expose_secret(), "secret");
    }
}
