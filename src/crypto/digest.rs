//! SHA-512 webhook signature computation.
//!
//! The payment gateway signs each notification as
//! `hex(sha512(order_id ‖ status_code ‖ gross_amount ‖ server_key))`.

use crate::config::Secret;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Compute the lowercase hex signature key for a notification.
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Byte-wise comparison whose timing does not depend on where inputs differ.
pub fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Authenticates inbound payment notifications.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    server_key: Secret,
}

impl SignatureVerifier {
    /// Create a verifier for the given gateway server key.
    pub fn new(server_key: Secret) -> Self {
        Self { server_key }
    }

    /// Recompute the signature and compare it to the one the gateway sent.
    ///
    /// Exact match on the hex string; any difference rejects.
    pub fn verify(
        &self,
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        received_signature: &str,
    ) -> bool {
        let expected = notification_signature(
            order_id,
            status_code,
            gross_amount,
            self.server_key.expose(),
        );
        constant_time_eq(received_signature.as_bytes(), expected.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "SB-Mid-server-TEST";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(Secret::new(KEY))
    }

    #[test]
    fn signature_is_128_lowercase_hex_chars() {
        let sig = notification_signature("ORDER-1", "200", "150000.00", KEY);
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signature_is_hash_of_concatenation() {
        let direct = hex::encode(Sha512::digest(
            format!("ORDER-1200150000.00{KEY}").as_bytes(),
        ));
        assert_eq!(
            notification_signature("ORDER-1", "200", "150000.00", KEY),
            direct
        );
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let sig = notification_signature("ORDER-1", "200", "150000.00", KEY);
        assert!(verifier().verify("ORDER-1", "200", "150000.00", &sig));
    }

    #[test]
    fn verify_rejects_signature_made_with_other_key() {
        let sig = notification_signature("ORDER-1", "200", "150000.00", "another-key");
        assert!(!verifier().verify("ORDER-1", "200", "150000.00", &sig));
    }

    #[test]
    fn verify_rejects_any_single_character_mutation() {
        let order_id = "ORDER-1";
        let status = "200";
        let amount = "150000.00";
        let sig = notification_signature(order_id, status, amount, KEY);
        let v = verifier();

        let mutate = |s: &str, i: usize| -> String {
            let mut chars: Vec<char> = s.chars().collect();
            chars[i] = if chars[i] == 'x' { 'y' } else { 'x' };
            chars.into_iter().collect()
        };

        for i in 0..order_id.len() {
            assert!(!v.verify(&mutate(order_id, i), status, amount, &sig));
        }
        for i in 0..status.len() {
            assert!(!v.verify(order_id, &mutate(status, i), amount, &sig));
        }
        for i in 0..amount.len() {
            assert!(!v.verify(order_id, status, &mutate(amount, i), &sig));
        }
        for i in 0..sig.len() {
            assert!(!v.verify(order_id, status, amount, &mutate(&sig, i)));
        }
    }

    #[test]
    fn verify_rejects_uppercased_signature() {
        let sig = notification_signature("ORDER-1", "200", "150000.00", KEY);
        assert!(!verifier().verify("ORDER-1", "200", "150000.00", &sig.to_uppercase()));
    }

    #[test]
    fn verify_rejects_empty_signature() {
        assert!(!verifier().verify("ORDER-1", "200", "150000.00", ""));
    }

    #[test]
    fn constant_time_eq_rejects_prefix() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"ab", b"abc"));
        assert!(!constant_time_eq(b"abd", b"abc"));
    }
}
