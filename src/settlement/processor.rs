//! Webhook-driven settlement.
//!
//! Fail-closed pipeline for one gateway notification:
//! 1. Recompute and compare the SHA-512 signature
//! 2. Map the gateway vocabulary onto the closed status set
//! 3. Load the live transaction and cross-check the amount
//! 4. Plan the transition (self-transition is a no-op)
//! 5. Commit status and gateway facts under the row version
//! 6. On first entry into `Settlement`, issue one artifact per ticket form
//!
//! Nothing is written unless steps 1 to 4 all pass.

use crate::artifact::TicketArtifactIssuer;
use crate::clock::Clock;
use crate::crypto::digest::SignatureVerifier;
use crate::domain::{ArtifactStatus, Transaction, TransactionStatus};
use crate::protocol::PaymentNotification;
use crate::settlement::transition::{self, TransitionFacts, TransitionPlan};
use crate::store::{CommitOutcome, TransactionStore};
use crate::TicketgateError;
use std::sync::Arc;
use uuid::Uuid;

/// Commit attempts before a contended transaction is reported as a conflict.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Artifact result for one ticket form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutcome {
    /// Ticket form the artifact belongs to.
    pub ticket_form_id: Uuid,
    /// What was recorded for it.
    pub status: ArtifactStatus,
}

/// Result of applying one notification.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// Transaction as stored after the notification.
    pub transaction: Transaction,
    /// Whether the status changed. False for redeliveries.
    pub changed: bool,
    /// Artifacts issued by this notification. Empty unless it settled the transaction.
    pub artifacts: Vec<ArtifactOutcome>,
}

/// Applies authenticated gateway notifications to stored transactions.
pub struct SettlementProcessor {
    verifier: SignatureVerifier,
    store: Arc<dyn TransactionStore>,
    issuer: Arc<TicketArtifactIssuer>,
    clock: Arc<dyn Clock>,
}

impl SettlementProcessor {
    /// Create a processor.
    pub fn new(
        verifier: SignatureVerifier,
        store: Arc<dyn TransactionStore>,
        issuer: Arc<TicketArtifactIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier,
            store,
            issuer,
            clock,
        }
    }

    /// Apply a gateway notification.
    ///
    /// # Errors
    /// * `SignatureMismatch` - signature does not verify; nothing is read or written
    /// * `Validation` - status, amount or gateway facts are out of their sets
    /// * `TransactionNotFound` - no live transaction with this order ID
    /// * `IllegalTransition` - requested status is unreachable
    /// * `StoreConflict` - lost the commit race on every attempt
    pub async fn apply_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<SettlementOutcome, TicketgateError> {
        if !self.verifier.verify(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &notification.signature_key,
        ) {
            tracing::warn!(order_id = %notification.order_id, "notification signature mismatch");
            return Err(TicketgateError::SignatureMismatch {
                order_id: notification.order_id.clone(),
            });
        }

        let requested = notification.requested_status()?;
        let amount = notification.amount()?;
        let facts = TransitionFacts {
            signature_key: Some(notification.signature_key.clone()),
            settlement_time: notification.settlement_time()?,
            payment_type: notification.payment_type()?,
            bank: notification.bank()?,
        };

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = self
                .store
                .find_by_order_id(&notification.order_id)
                .await?
                .ok_or_else(|| TicketgateError::TransactionNotFound {
                    order_id: notification.order_id.clone(),
                })?;

            if current.gross_amount != amount {
                return Err(TicketgateError::validation(
                    "gross_amount",
                    format!("notified {} but transaction is {}", amount, current.gross_amount),
                ));
            }

            let to = match transition::plan_transition(current.status, requested)? {
                TransitionPlan::Unchanged => {
                    tracing::debug!(
                        order_id = %current.order_id,
                        status = %current.status,
                        "redelivered notification, status unchanged"
                    );
                    return Ok(SettlementOutcome {
                        transaction: current,
                        changed: false,
                        artifacts: Vec::new(),
                    });
                }
                TransitionPlan::Apply { to, .. } => to,
            };

            let mut next = transition::apply(&current, to, &facts, self.clock.now_utc());
            match self.store.commit(&next, current.version).await? {
                CommitOutcome::Committed(version) => {
                    next.version = version;
                    tracing::info!(
                        order_id = %next.order_id,
                        from = %current.status,
                        to = %next.status,
                        "transaction status changed"
                    );
                    let artifacts = if to == TransactionStatus::Settlement {
                        match self.issue_missing_artifacts(&next).await {
                            Ok(artifacts) => artifacts,
                            Err(e) => {
                                tracing::error!(
                                    order_id = %next.order_id,
                                    error = %e,
                                    "ticket forms unavailable after settlement, artifacts left for retry"
                                );
                                Vec::new()
                            }
                        }
                    } else {
                        Vec::new()
                    };
                    return Ok(SettlementOutcome {
                        transaction: next,
                        changed: true,
                        artifacts,
                    });
                }
                CommitOutcome::VersionConflict => {
                    tracing::debug!(
                        order_id = %current.order_id,
                        attempt,
                        "version conflict, re-reading"
                    );
                }
            }
        }

        Err(TicketgateError::StoreConflict {
            order_id: notification.order_id.clone(),
        })
    }

    /// Issue artifacts for every ticket form under `transaction` that does
    /// not have one yet, recording each outcome.
    ///
    /// A form whose issuance fails is recorded as `Pending`; the settlement
    /// itself stands. A form whose outcome cannot be recorded is reported as
    /// `Pending` and the remaining forms are still processed.
    ///
    /// # Errors
    /// * `StoreIO` - the ticket forms could not be listed
    pub async fn issue_missing_artifacts(
        &self,
        transaction: &Transaction,
    ) -> Result<Vec<ArtifactOutcome>, TicketgateError> {
        let forms = self.store.ticket_forms(transaction.id).await?;
        let mut outcomes = Vec::with_capacity(forms.len());

        for form in forms {
            if matches!(form.artifact, ArtifactStatus::Issued { .. }) {
                continue;
            }
            let status = match self.issuer.issue(&form).await {
                Ok(url) => ArtifactStatus::Issued { url },
                Err(e) => {
                    tracing::error!(
                        order_id = %transaction.order_id,
                        ticket_form_id = %form.id,
                        error = %e,
                        "artifact issuance failed, left pending"
                    );
                    ArtifactStatus::Pending {
                        reason: e.to_string(),
                    }
                }
            };
            let status = match self.store.record_artifact(form.id, status.clone()).await {
                Ok(()) => status,
                Err(e) => {
                    tracing::error!(
                        order_id = %transaction.order_id,
                        ticket_form_id = %form.id,
                        error = %e,
                        "artifact outcome not recorded, left pending"
                    );
                    ArtifactStatus::Pending {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(ArtifactOutcome {
                ticket_form_id: form.id,
                status,
            });
        }

        Ok(outcomes)
    }
}
