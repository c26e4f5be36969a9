//! HTTP error responses.
//!
//! Every failure leaves the service as
//! `{"error": {"code": "...", "message": "...", "details": {...}}}`.
//! 5xx bodies never carry internal detail; it goes to the log instead.

use crate::policy::AccessError;
use crate::TicketgateError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error detail.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `VALIDATION_ERROR`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Extra context for client errors, e.g. the offending field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error type returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired or forged identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid identity or request origin, but not allowed (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A field is invalid (422).
    #[error("{message}")]
    Validation {
        /// Offending field, when known.
        field: Option<&'static str>,
        /// What was wrong.
        message: String,
    },

    /// No such resource (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payment gateway failed or answered nonsense (502).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Transient contention; the caller should retry (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Anything else (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream(_) => "The payment gateway is unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) => tracing::error!(error = %self, "upstream gateway error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let details = match &self {
            Self::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<TicketgateError> for ApiError {
    fn from(err: TicketgateError) -> Self {
        use TicketgateError as E;
        match &err {
            E::TokenMalformed(_)
            | E::UnsupportedAlgorithm { .. }
            | E::TokenSignatureInvalid
            | E::TokenExpired
            | E::IssuerMismatch => Self::Unauthorized(err.to_string()),
            E::SignatureMismatch { .. } => {
                Self::Forbidden("notification signature mismatch".to_string())
            }
            E::Validation { field, reason } => Self::Validation {
                field: Some(*field),
                message: format!("invalid {field}: {reason}"),
            },
            E::IllegalTransition { .. } | E::AlreadyCheckedIn(_) | E::NotRedeemable { .. } => {
                Self::Conflict(err.to_string())
            }
            E::TransactionNotFound { .. } | E::TicketFormNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            E::StoreConflict { .. } => Self::ServiceUnavailable(err.to_string()),
            E::GatewayTransport(_) | E::ProtocolError(_) => Self::Upstream(err.to_string()),
            E::ConfigError(_)
            | E::SigningError(_)
            | E::ArtifactGeneration(_)
            | E::ArtifactIO(_)
            | E::StoreIO(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        if err.is_authentication() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::Forbidden(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            field: None,
            message: rejection.body_text(),
        }
    }
}
