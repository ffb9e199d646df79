//! Korea Investment & Securities overseas-price REST provider.
//!
//! Every request goes through one rate limiter and one token provider, and is
//! retried with exponential backoff when the failure looks transient.

pub mod auth;
pub mod params;
pub mod provider;
pub mod response;
pub mod session;

pub use auth::{AppCredentials, KisAuth, TokenProvider};
pub use params::{SearchCondition, SearchRange};
pub use provider::{KisProvider, KisSettings, SearchHit};
pub use session::SessionMode;
