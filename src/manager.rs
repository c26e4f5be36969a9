//! Payment manager - the main public API for Ticketgate.
//!
//! The `PaymentManager` owns the wiring between:
//! - Identity tokens (issue and verify)
//! - Purchase registration and the payment gateway session
//! - Webhook settlement and artifact issuance
//! - Artifact redemption at the venue

use crate::artifact::{ArtifactStore, FileArtifactStore, PayloadSigner, TicketArtifactIssuer};
use crate::client::http::SnapClient;
use crate::client::{ChargeRequest, PaymentGateway, PaymentSession};
use crate::clock::{Clock, SystemClock};
use crate::config::TicketgateConfig;
use crate::crypto::digest::SignatureVerifier;
use crate::crypto::token::TokenCodec;
use crate::domain::{
    ArtifactStatus, GuestAttendance, PurchaseRequest, TicketForm, Transaction, TransactionStatus,
};
use crate::protocol::PaymentNotification;
use crate::settlement::{ArtifactOutcome, SettlementOutcome, SettlementProcessor};
use crate::store::TransactionStore;
use crate::TicketgateError;
use std::sync::Arc;
use uuid::Uuid;

/// Prefix of every order ID we hand to the gateway.
pub const ORDER_ID_PREFIX: &str = "TG-";

/// A registered purchase awaiting payment.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// Order ID shared with the gateway.
    pub order_id: String,
    /// Internal transaction ID.
    pub transaction_id: Uuid,
    /// One ticket form per attendee, in request order.
    pub ticket_form_ids: Vec<Uuid>,
    /// Gateway session the buyer completes payment in.
    pub session: PaymentSession,
}

/// Main entry point for Ticketgate.
///
/// Create one instance per process and share it behind an `Arc`.
pub struct PaymentManager {
    clock: Arc<dyn Clock>,
    tokens: TokenCodec,
    signer: PayloadSigner,
    store: Arc<dyn TransactionStore>,
    gateway: Arc<dyn PaymentGateway>,
    processor: SettlementProcessor,
}

impl PaymentManager {
    /// Create a manager talking to the configured gateway environment and
    /// writing artifacts under the configured directory.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    pub fn new(
        config: TicketgateConfig,
        store: Arc<dyn TransactionStore>,
    ) -> Result<Self, TicketgateError> {
        config.validate()?;
        let gateway = Arc::new(SnapClient::new(&config)?);
        let artifacts = Arc::new(FileArtifactStore::new(config.artifact_dir.clone()));
        Ok(Self::assemble(
            &config,
            Arc::new(SystemClock),
            store,
            gateway,
            artifacts,
        ))
    }

    /// Create a manager with every outside dependency injected (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_seams(
        config: TicketgateConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Result<Self, TicketgateError> {
        config.validate()?;
        Ok(Self::assemble(&config, clock, store, gateway, artifacts))
    }

    fn assemble(
        config: &TicketgateConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn TransactionStore>,
        gateway: Arc<dyn PaymentGateway>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        let signer = PayloadSigner::new(config.token_secret.clone());
        let issuer = Arc::new(TicketArtifactIssuer::new(
            signer.clone(),
            artifacts,
            config.public_base_url.clone(),
        ));
        let processor = SettlementProcessor::new(
            SignatureVerifier::new(config.gateway_server_key.clone()),
            store.clone(),
            issuer,
            clock.clone(),
        );

        Self {
            tokens: TokenCodec::from_config(config, clock.clone()),
            clock,
            signer,
            store,
            gateway,
            processor,
        }
    }

    /// Token codec used by the access gate and the login flow.
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Register a purchase intent and open its payment session.
    ///
    /// The transaction and its ticket forms are stored as `Pending` before
    /// the gateway is called. If the gateway refuses, the transaction is
    /// retired so it can never settle.
    ///
    /// # Errors
    /// - `Validation` - a field is out of its set
    /// - `GatewayTransport` / `ProtocolError` - session could not be opened
    pub async fn register_purchase(
        &self,
        user_id: &str,
        request: PurchaseRequest,
    ) -> Result<PurchaseReceipt, TicketgateError> {
        let purchase = request.validate()?;
        let now = self.clock.now_utc();

        let transaction = Transaction {
            id: Uuid::new_v4(),
            order_id: new_order_id(),
            item_type: purchase.item_type,
            audience_type: purchase.audience_type,
            referral_code: purchase.referral_code,
            status: TransactionStatus::Pending,
            payment_type: purchase.payment_type,
            bank: purchase.bank,
            settlement_time: None,
            gross_amount: purchase.gross_amount,
            signature_key: None,
            user_id: user_id.to_string(),
            item_id: purchase.item_id,
            created_at: now,
            retired_at: None,
            version: 0,
        };
        let forms: Vec<TicketForm> = purchase
            .attendees
            .iter()
            .map(|contact| TicketForm {
                id: Uuid::new_v4(),
                transaction_id: transaction.id,
                contact: contact.clone(),
                artifact: ArtifactStatus::NotIssued,
            })
            .collect();
        let ticket_form_ids = forms.iter().map(|f| f.id).collect();

        let customer = forms
            .first()
            .map(|f| f.contact.clone())
            .ok_or_else(|| TicketgateError::validation("attendees", "at least one attendee is required"))?;
        let charge = ChargeRequest {
            order_id: transaction.order_id.clone(),
            gross_amount: transaction.gross_amount,
            payment_type: transaction.payment_type,
            customer,
        };
        let order_id = transaction.order_id.clone();
        let transaction_id = transaction.id;
        self.store.insert(transaction, forms).await?;

        let session = match self.gateway.open_session(&charge).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "payment session failed, retiring order");
                self.store.retire(&order_id, self.clock.now_utc()).await?;
                return Err(e);
            }
        };

        tracing::info!(%order_id, %user_id, "purchase registered");
        Ok(PurchaseReceipt {
            order_id,
            transaction_id,
            ticket_form_ids,
            session,
        })
    }

    /// Apply a payment gateway notification.
    ///
    /// See [`SettlementProcessor::apply_notification`].
    pub async fn apply_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<SettlementOutcome, TicketgateError> {
        self.processor.apply_notification(notification).await
    }

    /// Re-run issuance for ticket forms whose artifact is still missing.
    ///
    /// # Errors
    /// - `TransactionNotFound` - no live transaction with this order ID
    /// - `NotRedeemable` - the transaction has not settled
    pub async fn retry_pending_artifacts(
        &self,
        order_id: &str,
    ) -> Result<Vec<ArtifactOutcome>, TicketgateError> {
        let transaction = self.live_transaction(order_id).await?;
        if transaction.status != TransactionStatus::Settlement {
            return Err(TicketgateError::NotRedeemable {
                status: transaction.status.to_string(),
            });
        }
        self.processor.issue_missing_artifacts(&transaction).await
    }

    /// Redeem a scanned artifact payload.
    ///
    /// # Errors
    /// - `Validation` - payload is malformed or its tag does not verify
    /// - `TicketFormNotFound` - payload names an unknown ticket form
    /// - `NotRedeemable` - the owning transaction is not settled, or is retired
    /// - `AlreadyCheckedIn` - the ticket form was redeemed before
    pub async fn check_in(
        &self,
        payload: &str,
        staff_subject: &str,
    ) -> Result<GuestAttendance, TicketgateError> {
        let payload = self.signer.decode(payload)?;

        let form = self
            .store
            .find_ticket_form(payload.ticket_form_id)
            .await?
            .ok_or_else(|| TicketgateError::TicketFormNotFound(payload.ticket_form_id.to_string()))?;
        if form.transaction_id != payload.transaction_id {
            return Err(TicketgateError::validation(
                "payload",
                "ticket form does not belong to transaction",
            ));
        }

        let transaction = self
            .store
            .find_by_id(form.transaction_id)
            .await?
            .ok_or_else(|| TicketgateError::TicketFormNotFound(form.id.to_string()))?;
        if transaction.is_retired() {
            return Err(TicketgateError::NotRedeemable {
                status: "retired".to_string(),
            });
        }
        if transaction.status != TransactionStatus::Settlement {
            return Err(TicketgateError::NotRedeemable {
                status: transaction.status.to_string(),
            });
        }

        let attendance = GuestAttendance {
            id: Uuid::new_v4(),
            ticket_form_id: form.id,
            checked_in_by: staff_subject.to_string(),
            checked_in_at: self.clock.now_utc(),
        };
        self.store.record_attendance(attendance.clone()).await?;

        tracing::info!(
            order_id = %transaction.order_id,
            ticket_form_id = %form.id,
            checked_in_by = %staff_subject,
            "guest checked in"
        );
        Ok(attendance)
    }

    /// Soft-retire a transaction. It stays readable by ID but no longer
    /// settles or redeems.
    pub async fn retire(&self, order_id: &str) -> Result<(), TicketgateError> {
        self.store.retire(order_id, self.clock.now_utc()).await?;
        tracing::info!(%order_id, "transaction retired");
        Ok(())
    }

    async fn live_transaction(&self, order_id: &str) -> Result<Transaction, TicketgateError> {
        self.store
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| TicketgateError::TransactionNotFound {
                order_id: order_id.to_string(),
            })
    }
}

fn new_order_id() -> String {
    format!(
        "{}{}",
        ORDER_ID_PREFIX,
        Uuid::new_v4().simple().to_string().to_uppercase()
    )
}
