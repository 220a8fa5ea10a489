//! Unverified reading of the LucidBot token payload.
//!
//! The expiry shown in the status listing is informational only, so the
//! signature is never checked and any decoding problem just yields `None`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Read the `expire` claim (seconds since the epoch) from a JWT payload.
///
/// Accepts both URL-safe and standard base64, with or without padding.
#[must_use]
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload) = (parts.next()?, parts.next()?);

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;

    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let expire = claims.get("expire")?;
    let seconds = match expire.as_i64() {
        Some(secs) => secs,
        // Fractional timestamps are truncated.
        #[allow(clippy::cast_possible_truncation)]
        None => expire.as_f64()? as i64,
    };

    DateTime::from_timestamp(seconds, 0)
}
