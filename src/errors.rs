//! Ticketgate error types.

use thiserror::Error;

/// Errors that can occur in token handling, webhook ingestion and settlement.
#[derive(Debug, Error)]
pub enum TicketgateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Token could not be signed (signing key unavailable).
    #[error("Token signing failed: {0}")]
    SigningError(String),

    /// Token is not a well-formed three-segment token.
    #[error("Malformed token: {0}")]
    TokenMalformed(String),

    /// Token header names an algorithm other than the one we sign with.
    #[error("Unsupported token algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The algorithm named in the token header.
        algorithm: String,
    },

    /// Token MAC does not match the recomputed value.
    #[error("Token signature verification failed")]
    TokenSignatureInvalid,

    /// Token validity window has elapsed.
    #[error("Token expired")]
    TokenExpired,

    /// Token was issued by someone else.
    #[error("Token issuer mismatch")]
    IssuerMismatch,

    /// Webhook signature key does not match the recomputed digest.
    #[error("Notification signature mismatch for order {order_id}")]
    SignatureMismatch {
        /// Order ID carried by the rejected notification.
        order_id: String,
    },

    /// A field is outside its closed set or otherwise invalid.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Requested status is not reachable from the current status.
    #[error("Illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// No live transaction with this order ID.
    #[error("Transaction not found: {order_id}")]
    TransactionNotFound {
        /// The order ID that was looked up.
        order_id: String,
    },

    /// No ticket form with this ID.
    #[error("Ticket form not found: {0}")]
    TicketFormNotFound(String),

    /// Ticket form has already been checked in.
    #[error("Ticket form {0} already checked in")]
    AlreadyCheckedIn(String),

    /// Ticket cannot be redeemed because its transaction is not settled.
    #[error("Ticket not redeemable, transaction status is {status}")]
    NotRedeemable {
        /// Current status of the owning transaction.
        status: String,
    },

    /// Artifact content could not be encoded or rendered.
    #[error("Artifact generation failed: {0}")]
    ArtifactGeneration(String),

    /// Artifact storage write failed.
    #[error("Artifact storage error: {0}")]
    ArtifactIO(String),

    /// Transaction store failure.
    #[error("Store error: {0}")]
    StoreIO(String),

    /// Concurrent update to the same transaction won every retry.
    #[error("Concurrent update conflict on order {order_id}")]
    StoreConflict {
        /// Order ID of the contended row.
        order_id: String,
    },

    /// HTTP transport error talking to the payment gateway.
    #[error("Gateway transport error: {0}")]
    GatewayTransport(String),

    /// Payment gateway returned something we could not use.
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl TicketgateError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this is an authentication failure on a bearer token.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenMalformed(_)
                | Self::UnsupportedAlgorithm { .. }
                | Self::TokenSignatureInvalid
                | Self::TokenExpired
                | Self::IssuerMismatch
        )
    }
}
