//! Token validity window enforcement.

use crate::clock::Clock;
use crate::TicketgateError;
use chrono::{DateTime, TimeZone, Utc};

/// Tolerated clock skew for `iat` values in the future (60 seconds).
pub const MAX_FUTURE_ISSUE_SECONDS: i64 = 60;

/// Convert a unix timestamp claim to a UTC instant.
pub fn from_unix(seconds: i64) -> Result<DateTime<Utc>, TicketgateError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| TicketgateError::TokenMalformed(format!("timestamp out of range: {seconds}")))
}

/// Check that a token is inside its validity window.
///
/// # Errors
/// * `TokenExpired` - `now >= expires_at`
/// * `TokenMalformed` - `issued_at` is more than 60s ahead of `now`, or after `expires_at`
pub fn check_validity<C: Clock + ?Sized>(
    issued_at: i64,
    expires_at: i64,
    clock: &C,
) -> Result<(), TicketgateError> {
    let now = clock.now_utc().timestamp();

    if expires_at <= issued_at {
        return Err(TicketgateError::TokenMalformed(
            "exp must be after iat".to_string(),
        ));
    }

    if now >= expires_at {
        return Err(TicketgateError::TokenExpired);
    }

    if issued_at - now > MAX_FUTURE_ISSUE_SECONDS {
        return Err(TicketgateError::TokenMalformed(
            "iat is in the future".to_string(),
        ));
    }

    Ok(())
}
