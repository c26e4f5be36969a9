//! Route handlers. Thin: decode, call the manager, encode.

use crate::crypto::token::Claims;
use crate::domain::{ArtifactStatus, GuestAttendance, PurchaseRequest, TransactionStatus};
use crate::http::error::ApiError;
use crate::http::AppState;
use crate::protocol::PaymentNotification;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reply to the payment gateway.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationAck {
    /// Order the notification was about.
    pub order_id: String,
    /// Status after the notification.
    pub status: TransactionStatus,
    /// False for a redelivery.
    pub changed: bool,
}

/// Reply to a purchase registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseResponse {
    /// Order ID shared with the gateway.
    pub order_id: String,
    /// Internal transaction ID.
    pub transaction_id: Uuid,
    /// One per attendee, in request order.
    pub ticket_form_ids: Vec<Uuid>,
    /// Gateway session token.
    pub payment_token: String,
    /// Where the buyer completes payment.
    pub redirect_url: String,
}

/// Body of a check-in request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInRequest {
    /// Content scanned from the artifact.
    pub payload: String,
}

/// Artifact outcome for one ticket form.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactBody {
    /// Ticket form.
    pub ticket_form_id: Uuid,
    /// Recorded outcome.
    pub artifact: ArtifactStatus,
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /webhooks/payment`
///
/// Answers 2xx only once the notification is durably applied, so the
/// gateway keeps redelivering anything that failed.
pub async fn payment_notification(
    State(state): State<AppState>,
    body: Result<Json<PaymentNotification>, JsonRejection>,
) -> Result<Json<NotificationAck>, ApiError> {
    let Json(notification) = body?;
    let outcome = state.manager.apply_notification(&notification).await?;
    Ok(Json(NotificationAck {
        order_id: outcome.transaction.order_id,
        status: outcome.transaction.status,
        changed: outcome.changed,
    }))
}

/// `POST /transactions` (Guest)
pub async fn register_purchase(
    State(state): State<AppState>,
    claims: Claims,
    body: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let Json(request) = body?;
    let receipt = state.manager.register_purchase(&claims.sub, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            order_id: receipt.order_id,
            transaction_id: receipt.transaction_id,
            ticket_form_ids: receipt.ticket_form_ids,
            payment_token: receipt.session.token,
            redirect_url: receipt.session.redirect_url,
        }),
    ))
}

/// `POST /check-ins` (Admin)
pub async fn check_in(
    State(state): State<AppState>,
    claims: Claims,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GuestAttendance>), ApiError> {
    let Json(request) = body?;
    let attendance = state.manager.check_in(&request.payload, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(attendance)))
}

/// `POST /transactions/:order_id/artifacts/retry` (Admin)
pub async fn retry_artifacts(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Vec<ArtifactBody>>, ApiError> {
    let outcomes = state.manager.retry_pending_artifacts(&order_id).await?;
    Ok(Json(
        outcomes
            .into_iter()
            .map(|o| ArtifactBody {
                ticket_form_id: o.ticket_form_id,
                artifact: o.status,
            })
            .collect(),
    ))
}
