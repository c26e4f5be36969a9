//! Check-in payload carried inside the QR code.
//!
//! Format: `TG1.<transaction_id>.<ticket_form_id>.<tag>` where `tag` is
//! base64url HMAC-SHA256 over `<transaction_id>.<ticket_form_id>`. The venue
//! scanner sends the string back verbatim; the tag proves we minted it.

use crate::config::Secret;
use crate::TicketgateError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const PAYLOAD_VERSION: &str = "TG1";

/// Decoded and authenticated check-in payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInPayload {
    /// Owning transaction.
    pub transaction_id: Uuid,
    /// Attendee's ticket form.
    pub ticket_form_id: Uuid,
}

/// Mints and authenticates check-in payloads.
#[derive(Debug, Clone)]
pub struct PayloadSigner {
    secret: Secret,
}

impl PayloadSigner {
    /// Create a signer.
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Content string for one attendee.
    pub fn encode(&self, payload: &CheckInPayload) -> Result<String, TicketgateError> {
        let body = format!("{}.{}", payload.transaction_id, payload.ticket_form_id);
        let tag = self.mac(&body)?.finalize().into_bytes();
        Ok(format!(
            "{}.{}.{}",
            PAYLOAD_VERSION,
            body,
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Parse a scanned content string and check its tag.
    ///
    /// # Errors
    /// * `Validation { field: "payload" }` - wrong shape, bad IDs or bad tag
    pub fn decode(&self, content: &str) -> Result<CheckInPayload, TicketgateError> {
        let invalid = |reason: &str| TicketgateError::validation("payload", reason.to_string());

        let parts: Vec<&str> = content.trim().split('.').collect();
        let [version, transaction_id, ticket_form_id, tag] = parts.as_slice() else {
            return Err(invalid("expected four segments"));
        };
        if *version != PAYLOAD_VERSION {
            return Err(invalid("unknown payload version"));
        }

        let transaction_id =
            Uuid::parse_str(transaction_id).map_err(|_| invalid("bad transaction id"))?;
        let ticket_form_id =
            Uuid::parse_str(ticket_form_id).map_err(|_| invalid("bad ticket form id"))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| invalid("bad tag encoding"))?;

        let body = format!("{}.{}", transaction_id, ticket_form_id);
        self.mac(&body)?
            .verify_slice(&tag)
            .map_err(|_| invalid("tag mismatch"))?;

        Ok(CheckInPayload {
            transaction_id,
            ticket_form_id,
        })
    }

    fn mac(&self, body: &str) -> Result<HmacSha256, TicketgateError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose().as_bytes())
            .map_err(|e| TicketgateError::ArtifactGeneration(format!("invalid key: {}", e)))?;
        mac.update(body.as_bytes());
        Ok(mac)
    }
}
