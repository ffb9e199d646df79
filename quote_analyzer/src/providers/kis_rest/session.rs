//! Day/night exchange code translation.
//!
//! While the US daytime session is open, quote requests must use the daytime
//! venue codes (`BAA`, `BAQ`, `BAY`). Assembled data keeps the regular code.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{models::exchange::Exchange, providers::ProviderError};

/// How long a day/night answer is reused before asking again.
pub const SESSION_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Ask the API which session is active.
    #[default]
    Auto,
    /// Always use the regular code.
    Regular,
    /// Always use the daytime code.
    Daytime,
}

pub fn wire_code(exchange: Exchange, daytime: bool) -> &'static str {
    if daytime {
        exchange.daytime_code()
    } else {
        exchange.code()
    }
}

pub struct SessionResolver {
    mode: SessionMode,
    ttl: Duration,
    cached: Mutex<Option<(Instant, bool)>>,
}

impl SessionResolver {
    pub fn new(mode: SessionMode) -> Self {
        Self::with_ttl(mode, SESSION_CACHE_TTL)
    }

    pub fn with_ttl(mode: SessionMode, ttl: Duration) -> Self {
        Self {
            mode,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Returns the exchange code to put on the wire. `lookup` is only called
    /// in [`SessionMode::Auto`] when the cached answer is missing or stale.
    pub async fn resolve<F, Fut>(&self, exchange: Exchange, lookup: F) -> Result<&'static str, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, ProviderError>>,
    {
        let daytime = match self.mode {
            SessionMode::Regular => false,
            SessionMode::Daytime => true,
            SessionMode::Auto => {
                let cached = *self.cached.lock().await;
                match cached {
                    Some((at, daytime)) if at.elapsed() < self.ttl => daytime,
                    _ => {
                        let daytime = lookup().await?;
                        *self.cached.lock().await = Some((Instant::now(), daytime));
                        daytime
                    }
                }
            }
        };
        Ok(wire_code(exchange, daytime))
    }
}
