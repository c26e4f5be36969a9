//! Outbound payment gateway client.

pub mod http;

use crate::domain::{Contact, GrossAmount, PaymentType};
use crate::TicketgateError;
use async_trait::async_trait;

/// What the gateway needs to open a payment session.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Our order ID.
    pub order_id: String,
    /// Amount to charge.
    pub gross_amount: GrossAmount,
    /// Payment method the buyer picked.
    pub payment_type: PaymentType,
    /// Buyer contact (first attendee).
    pub customer: Contact,
}

/// An opened payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Gateway session token.
    pub token: String,
    /// Where to send the buyer.
    pub redirect_url: String,
}

/// Payment gateway seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment session for a registered purchase.
    async fn open_session(&self, request: &ChargeRequest)
        -> Result<PaymentSession, TicketgateError>;
}
