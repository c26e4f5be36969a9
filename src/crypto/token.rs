//! Compact HMAC-SHA256 identity tokens.
//!
//! Format: `base64url(header) "." base64url(claims) "." base64url(mac)`, where
//! the MAC is HMAC-SHA256 over the first two segments joined by `.`.
//!
//! Verification order:
//! 1. Structure (three segments, decodable header)
//! 2. Algorithm must be `HS256` (rejects `none` and asymmetric substitution)
//! 3. MAC, compared in constant time
//! 4. Claims decode, issuer, validity window

use crate::clock::Clock;
use crate::config::{Secret, TicketgateConfig};
use crate::crypto::expiry::check_validity;
use crate::domain::Role;
use crate::TicketgateError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// The only algorithm we sign with or accept.
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Token header.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Verified identity claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user ID.
    pub sub: String,
    /// Role. Absent on tokens minted without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Issuer.
    pub iss: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

/// Signs and verifies identity tokens.
pub struct TokenCodec {
    secret: Secret,
    issuer: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec.
    pub fn new(secret: Secret, issuer: impl Into<String>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
            ttl,
            clock,
        }
    }

    /// Create a codec from the token section of the configuration.
    pub fn from_config(config: &TicketgateConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.token_secret.clone(),
            config.token_issuer.clone(),
            config.token_ttl,
            clock,
        )
    }

    /// Issue a token for `subject` with `role`, valid for the configured window.
    ///
    /// # Errors
    /// * `SigningError` - the signing secret is unavailable, or the ttl overflows the expiry
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, TicketgateError> {
        let iat = self.clock.now_utc().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| {
                TicketgateError::SigningError(format!(
                    "token ttl of {}s overflows the expiry",
                    self.ttl.as_secs()
                ))
            })?;
        let claims = Claims {
            sub: subject.to_string(),
            role: Some(role),
            iss: self.issuer.clone(),
            iat,
            exp,
        };
        self.sign_claims(&claims)
    }

    /// Sign arbitrary claims.
    pub(crate) fn sign_claims(&self, claims: &Claims) -> Result<String, TicketgateError> {
        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| TicketgateError::SigningError(format!("header encode: {}", e)))?;
        let claims_json = serde_json::to_vec(claims)
            .map_err(|e| TicketgateError::SigningError(format!("claims encode: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mac = self.mac(signing_input.as_bytes())?;
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(mac)))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// * `TokenMalformed` - wrong structure, bad base64 or JSON
    /// * `UnsupportedAlgorithm` - header names anything but `HS256`
    /// * `TokenSignatureInvalid` - MAC mismatch
    /// * `IssuerMismatch` - `iss` is not ours
    /// * `TokenExpired` - `now >= exp`
    pub fn verify(&self, token: &str) -> Result<Claims, TicketgateError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(mac_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TicketgateError::TokenMalformed(
                "expected three segments".to_string(),
            ));
        };

        let header: TokenHeader = decode_segment(header_b64, "header")?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(TicketgateError::UnsupportedAlgorithm {
                algorithm: header.alg,
            });
        }

        let provided_mac = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|e| TicketgateError::TokenMalformed(format!("signature base64: {}", e)))?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        let signing_input = &token.as_bytes()[..signing_input_len];
        self.keyed_mac(signing_input)?
            .verify_slice(&provided_mac)
            .map_err(|_| TicketgateError::TokenSignatureInvalid)?;

        let claims: Claims = decode_segment(claims_b64, "claims")?;
        if claims.iss != self.issuer {
            return Err(TicketgateError::IssuerMismatch);
        }
        check_validity(claims.iat, claims.exp, self.clock.as_ref())?;

        Ok(claims)
    }

    fn keyed_mac(&self, input: &[u8]) -> Result<HmacSha256, TicketgateError> {
        if self.secret.is_empty() {
            return Err(TicketgateError::SigningError(
                "token secret unavailable".to_string(),
            ));
        }
        let mut mac = HmacSha256::new_from_slice(self.secret.expose().as_bytes())
            .map_err(|e| TicketgateError::SigningError(format!("invalid key: {}", e)))?;
        mac.update(input);
        Ok(mac)
    }

    fn mac(&self, input: &[u8]) -> Result<Vec<u8>, TicketgateError> {
        Ok(self.keyed_mac(input)?.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &self.secret)
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, TicketgateError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TicketgateError::TokenMalformed(format!("{} base64: {}", what, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TicketgateError::TokenMalformed(format!("{} json: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    const SECRET: &str = "test-token-secret";
    const ISSUER: &str = "ticketgate-test";

    fn codec(clock: &MockClock) -> TokenCodec {
        TokenCodec::new(
            Secret::new(SECRET),
            ISSUER,
            Duration::from_secs(3600),
            Arc::new(clock.clone()),
        )
    }

    fn clock() -> MockClock {
        MockClock::from_rfc3339("2025-01-15T12:00:00Z")
    }

    fn forge(header_json: &str, claims_json: &str, key: &[u8]) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(input.as_bytes());
        format!(
            "{}.{}",
            input,
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        )
    }

    #[test]
    fn oversized_ttl_is_a_signing_error() {
        let clock = clock();
        for secs in [u64::MAX, i64::MAX as u64] {
            let codec = TokenCodec::new(
                Secret::new(SECRET),
                ISSUER,
                Duration::from_secs(secs),
                Arc::new(clock.clone()),
            );
            assert!(matches!(
                codec.issue("user-1", Role::Guest),
                Err(TicketgateError::SigningError(_))
            ));
        }
    }

    #[test]
    fn issue_then_verify_preserves_subject_and_role() {
        let clock = clock();
        let codec = codec(&clock);

        for (subject, role) in [
            ("user-1", Role::Guest),
            ("staff-42", Role::Admin),
            ("", Role::Guest),
            ("ünïcødé/subject with spaces", Role::Admin),
        ] {
            let token = codec.issue(subject, role).unwrap();
            let claims = codec.verify(&token).unwrap();
            assert_eq!(claims.sub, subject);
            assert_eq!(claims.role, Some(role));
            assert_eq!(claims.iss, ISSUER);
            assert_eq!(claims.exp - claims.iat, 3600);
        }
    }

    #[test]
    fn token_has_three_url_safe_segments() {
        let clock = clock();
        let token = codec(&clock).issue("user-1", Role::Guest).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn verify_fails_after_validity_window() {
        let clock = clock();
        let codec = codec(&clock);
        let token = codec.issue("user-1", Role::Guest).unwrap();

        clock.advance(chrono::Duration::seconds(3599));
        assert!(codec.verify(&token).is_ok());

        clock.advance(chrono::Duration::seconds(1));
        assert!(matches!(codec.verify(&token), Err(TicketgateError::TokenExpired)));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let clock = clock();
        let token = codec(&clock).issue("user-1", Role::Admin).unwrap();
        let other = TokenCodec::new(
            Secret::new("different-secret"),
            ISSUER,
            Duration::from_secs(3600),
            Arc::new(clock.clone()),
        );
        assert!(matches!(
            other.verify(&token),
            Err(TicketgateError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn verify_rejects_tampered_claims() {
        let clock = clock();
        let codec = codec(&clock);
        let token = codec.issue("user-1", Role::Guest).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let escalated = format!(
            r#"{{"sub":"user-1","role":"admin","iss":"{}","iat":1736942400,"exp":1736946000}}"#,
            ISSUER
        );
        let tampered = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(escalated),
            parts[2]
        );
        assert!(matches!(
            codec.verify(&tampered),
            Err(TicketgateError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn verify_rejects_none_algorithm() {
        let clock = clock();
        let claims = format!(
            r#"{{"sub":"user-1","role":"admin","iss":"{}","iat":1736942400,"exp":1736946000}}"#,
            ISSUER
        );
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        );
        assert!(matches!(
            codec(&clock).verify(&token),
            Err(TicketgateError::UnsupportedAlgorithm { algorithm }) if algorithm == "none"
        ));
    }

    #[test]
    fn verify_rejects_asymmetric_algorithm_even_with_valid_mac() {
        let clock = clock();
        let claims = format!(
            r#"{{"sub":"user-1","role":"admin","iss":"{}","iat":1736942400,"exp":1736946000}}"#,
            ISSUER
        );
        let token = forge(r#"{"alg":"RS256","typ":"JWT"}"#, &claims, SECRET.as_bytes());
        assert!(matches!(
            codec(&clock).verify(&token),
            Err(TicketgateError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn verify_rejects_foreign_issuer() {
        let clock = clock();
        let claims = r#"{"sub":"user-1","role":"guest","iss":"someone-else","iat":1736942400,"exp":1736946000}"#;
        let token = forge(r#"{"alg":"HS256"}"#, claims, SECRET.as_bytes());
        assert!(matches!(
            codec(&clock).verify(&token),
            Err(TicketgateError::IssuerMismatch)
        ));
    }

    #[test]
    fn verify_accepts_token_without_role_claim() {
        let clock = clock();
        let claims = format!(
            r#"{{"sub":"user-1","iss":"{}","iat":1736942400,"exp":1736946000}}"#,
            ISSUER
        );
        let token = forge(r#"{"alg":"HS256"}"#, &claims, SECRET.as_bytes());
        let verified = codec(&clock).verify(&token).unwrap();
        assert_eq!(verified.role, None);
    }

    #[test]
    fn verify_rejects_unknown_role_as_malformed() {
        let clock = clock();
        let claims = format!(
            r#"{{"sub":"user-1","role":"root","iss":"{}","iat":1736942400,"exp":1736946000}}"#,
            ISSUER
        );
        let token = forge(r#"{"alg":"HS256"}"#, &claims, SECRET.as_bytes());
        assert!(matches!(
            codec(&clock).verify(&token),
            Err(TicketgateError::TokenMalformed(_))
        ));
    }

    #[test]
    fn verify_rejects_malformed_structure() {
        let clock = clock();
        let codec = codec(&clock);
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(
                matches!(codec.verify(token), Err(TicketgateError::TokenMalformed(_))),
                "accepted {token:?}"
            );
        }
    }

    #[test]
    fn issue_fails_without_secret() {
        let clock = clock();
        let codec = TokenCodec::new(
            Secret::new(""),
            ISSUER,
            Duration::from_secs(3600),
            Arc::new(clock),
        );
        assert!(matches!(
            codec.issue("user-1", Role::Guest),
            Err(TicketgateError::SigningError(_))
        ));
    }

    #[test]
    fn debug_does_not_print_secret() {
        let clock = clock();
        let rendered = format!("{:?}", codec(&clock));
        assert!(!rendered.contains(SECRET));
    }
}
