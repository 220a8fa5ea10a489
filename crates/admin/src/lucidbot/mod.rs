//! LucidBot remote platform integration.
//!
//! LucidBot authenticates panel requests with a JWT carried in a `token`
//! cookie next to a `last_page_id` cookie that selects the workspace. This
//! crate only needs two things from it: checking that a token is accepted
//! ([`LucidbotClient`]) and reading the token's `expire` claim for display
//! ([`token_expiry`]).

pub mod client;
pub mod jwt;

use async_trait::async_trait;
use thiserror::Error;

pub use client::LucidbotClient;
pub use jwt::token_expiry;

/// Errors that can occur while talking to LucidBot.
#[derive(Debug, Error)]
pub enum LucidbotError {
    /// HTTP request failed (connect, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The panel answered with a non-200 status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The panel answered 200 but did not report `status: "OK"`.
    #[error("Token invalid or expired")]
    Rejected,

    /// The validation URL could not be built from the configured base.
    #[error("invalid LucidBot URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Outcome of checking a candidate token against LucidBot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidation {
    pub ok: bool,
    /// Human-readable reason when `ok` is false.
    pub error: Option<String>,
    /// Remote `recordsTotal` when `ok` is true.
    pub total_contacts: Option<i64>,
}

impl TokenValidation {
    #[must_use]
    pub const fn accepted(total_contacts: i64) -> Self {
        Self {
            ok: true,
            error: None,
            total_contacts: Some(total_contacts),
        }
    }

    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(reason.into()),
            total_contacts: None,
        }
    }
}

/// Checks whether LucidBot accepts a token for a page.
///
/// Implementations never fail: every problem is folded into a rejected
/// [`TokenValidation`].
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str, page_id: &str) -> TokenValidation;
}
