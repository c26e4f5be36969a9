//! Role-gated authorization of bearer tokens.
//!
//! Sequential, short-circuiting checks:
//! 1. Header present
//! 2. `Bearer ` scheme
//! 3. Token verifies (algorithm, signature, issuer, expiry)
//! 4. Role claim present
//! 5. Role equals the endpoint's required role
//!
//! Only the last one is an authorization failure; the rest are authentication.

use crate::crypto::token::{Claims, TokenCodec};
use crate::domain::Role;
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was refused at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No `Authorization` header.
    #[error("authorization token not found")]
    TokenNotFound,

    /// Header is not a bearer token, or the token does not verify.
    #[error("authorization token is not valid")]
    TokenNotValid,

    /// Token verified but carries no role.
    #[error("token claims are missing the role")]
    ClaimsMissing,

    /// Role does not match the endpoint's required role.
    #[error("access denied")]
    AccessDenied,
}

impl AccessError {
    /// Whether this is an identity failure (401) rather than a role failure (403).
    pub fn is_authentication(&self) -> bool {
        !matches!(self, Self::AccessDenied)
    }
}

/// Check an `Authorization` header value against a required role.
///
/// # Returns
/// * `Ok(claims)` - Access granted; attach `claims` to the request
/// * `Err(TokenNotFound)` - No header
/// * `Err(TokenNotValid)` - Wrong scheme or token failed verification
/// * `Err(ClaimsMissing)` - Token has no role claim
/// * `Err(AccessDenied)` - Role is not `required`
pub fn authorize(
    header: Option<&str>,
    codec: &TokenCodec,
    required: Role,
) -> Result<Claims, AccessError> {
    let header = header.ok_or(AccessError::TokenNotFound)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AccessError::TokenNotValid)?;

    let claims = codec.verify(token).map_err(|e| {
        tracing::warn!(error = %e, "bearer token rejected");
        AccessError::TokenNotValid
    })?;

    let role = claims.role.ok_or(AccessError::ClaimsMissing)?;
    if role != required {
        tracing::warn!(subject = %claims.sub, %role, %required, "role mismatch");
        return Err(AccessError::AccessDenied);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::Secret;
    use std::sync::Arc;
    use std::time::Duration;

    fn codec(clock: MockClock) -> TokenCodec {
        TokenCodec::new(
            Secret::new("access-secret"),
            "ticketgate",
            Duration::from_secs(3600),
            Arc::new(clock),
        )
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn matching_role_passes_with_claims() {
        let codec = codec(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let token = codec.issue("admin-1", Role::Admin).unwrap();
        let claims = authorize(Some(&bearer(&token)), &codec, Role::Admin).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.role, Some(Role::Admin));
    }

    #[test]
    fn missing_header_is_token_not_found() {
        let codec = codec(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        assert_eq!(
            authorize(None, &codec, Role::Guest),
            Err(AccessError::TokenNotFound)
        );
    }

    #[test]
    fn wrong_scheme_is_token_not_valid() {
        let codec = codec(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let token = codec.issue("guest-1", Role::Guest).unwrap();
        for header in [token.clone(), format!("Basic {token}"), "Bearer ".to_string()] {
            assert_eq!(
                authorize(Some(&header), &codec, Role::Guest),
                Err(AccessError::TokenNotValid),
                "{header}"
            );
        }
    }

    #[test]
    fn expired_token_is_token_not_valid() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let codec = codec(clock.clone());
        let token = codec.issue("guest-1", Role::Guest).unwrap();
        clock.advance(chrono::Duration::seconds(3600));
        assert_eq!(
            authorize(Some(&bearer(&token)), &codec, Role::Guest),
            Err(AccessError::TokenNotValid)
        );
    }

    #[test]
    fn token_from_other_secret_is_token_not_valid() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let other = TokenCodec::new(
            Secret::new("someone-else"),
            "ticketgate",
            Duration::from_secs(3600),
            Arc::new(clock.clone()),
        );
        let token = other.issue("admin-1", Role::Admin).unwrap();
        assert_eq!(
            authorize(Some(&bearer(&token)), &codec(clock), Role::Admin),
            Err(AccessError::TokenNotValid)
        );
    }

    #[test]
    fn token_without_role_is_claims_missing() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let codec = codec(clock.clone());
        let now = chrono::DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
            .unwrap()
            .timestamp();
        let token = codec
            .sign_claims(&Claims {
                sub: "user-1".to_string(),
                role: None,
                iss: "ticketgate".to_string(),
                iat: now,
                exp: now + 60,
            })
            .unwrap();
        assert_eq!(
            authorize(Some(&bearer(&token)), &codec, Role::Guest),
            Err(AccessError::ClaimsMissing)
        );
    }

    #[test]
    fn guest_on_admin_route_is_denied() {
        let codec = codec(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let token = codec.issue("guest-1", Role::Guest).unwrap();
        let err = authorize(Some(&bearer(&token)), &codec, Role::Admin).unwrap_err();
        assert_eq!(err, AccessError::AccessDenied);
        assert!(!err.is_authentication());
    }

    #[test]
    fn admin_on_guest_route_is_denied() {
        let codec = codec(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let token = codec.issue("admin-1", Role::Admin).unwrap();
        assert_eq!(
            authorize(Some(&bearer(&token)), &codec, Role::Guest),
            Err(AccessError::AccessDenied)
        );
    }
}
