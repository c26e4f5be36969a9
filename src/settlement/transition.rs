//! Transaction status transition table.
//!
//! ```text
//! Pending ──▶ Settlement ──▶ Refund
//!    │
//!    ├──▶ Failure
//!    ├──▶ Expired
//!    ├──▶ Cancelled
//!    └──▶ Denied
//! ```
//!
//! A request for the current status is an idempotent no-op; gateways
//! redeliver notifications.

use crate::domain::{Bank, PaymentType, Transaction, TransactionStatus};
use crate::TicketgateError;
use chrono::{DateTime, Utc};

/// Statuses reachable in one step from `from`.
pub fn allowed_transitions(from: TransactionStatus) -> &'static [TransactionStatus] {
    use TransactionStatus::*;
    match from {
        Pending => &[Settlement, Failure, Expired, Cancelled, Denied],
        Settlement => &[Refund],
        Failure | Expired | Cancelled | Denied | Refund => &[],
    }
}

/// Whether no further transition leaves `status`.
pub fn is_terminal(status: TransactionStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Result of evaluating a requested status against the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Requested status equals the current status.
    Unchanged,
    /// Legal move.
    Apply {
        /// Current status.
        from: TransactionStatus,
        /// Target status.
        to: TransactionStatus,
    },
}

impl TransitionPlan {
    /// Whether this plan enters `Settlement`, the only issuance trigger.
    pub fn enters_settlement(&self) -> bool {
        matches!(
            self,
            Self::Apply {
                to: TransactionStatus::Settlement,
                ..
            }
        )
    }
}

/// Decide whether `requested` may follow `current`.
///
/// # Errors
/// * `IllegalTransition` - `requested` is neither `current` nor reachable from it
pub fn plan_transition(
    current: TransactionStatus,
    requested: TransactionStatus,
) -> Result<TransitionPlan, TicketgateError> {
    if current == requested {
        return Ok(TransitionPlan::Unchanged);
    }
    if allowed_transitions(current).contains(&requested) {
        return Ok(TransitionPlan::Apply {
            from: current,
            to: requested,
        });
    }
    Err(TicketgateError::IllegalTransition {
        from: current.to_string(),
        to: requested.to_string(),
    })
}

/// Gateway facts recorded alongside a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionFacts {
    /// Signature key the notification carried.
    pub signature_key: Option<String>,
    /// Gateway-reported settlement time.
    pub settlement_time: Option<DateTime<Utc>>,
    /// Payment method reported by the gateway.
    pub payment_type: Option<PaymentType>,
    /// Acquiring bank reported by the gateway.
    pub bank: Option<Bank>,
}

/// Produce the next version of `transaction` for an `Apply` plan.
///
/// Status and settlement time change together; entering `Settlement` stamps
/// the gateway's settlement time, or `now` when the gateway sent none.
pub fn apply(
    transaction: &Transaction,
    to: TransactionStatus,
    facts: &TransitionFacts,
    now: DateTime<Utc>,
) -> Transaction {
    let mut next = transaction.clone();
    next.status = to;
    if to == TransactionStatus::Settlement {
        next.settlement_time = Some(facts.settlement_time.unwrap_or(now));
    }
    if let Some(signature_key) = &facts.signature_key {
        next.signature_key = Some(signature_key.clone());
    }
    if let Some(payment_type) = facts.payment_type {
        next.payment_type = payment_type;
    }
    if facts.bank.is_some() {
        next.bank = facts.bank;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AudienceType, GrossAmount, ItemType};
    use uuid::Uuid;

    fn transaction(status: TransactionStatus) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            order_id: "TG-1".to_string(),
            item_type: ItemType::Ticket,
            audience_type: AudienceType::General,
            referral_code: None,
            status,
            payment_type: PaymentType::BankTransfer,
            bank: None,
            settlement_time: None,
            gross_amount: GrossAmount::from_units(150_000).unwrap(),
            signature_key: None,
            user_id: "user-1".to_string(),
            item_id: "day-1".to_string(),
            created_at: Utc::now(),
            retired_at: None,
            version: 1,
        }
    }

    #[test]
    fn plan_succeeds_exactly_for_allowed_or_self() {
        for &from in TransactionStatus::ALL {
            for &to in TransactionStatus::ALL {
                let result = plan_transition(from, to);
                let legal = from == to || allowed_transitions(from).contains(&to);
                assert_eq!(result.is_ok(), legal, "{from} -> {to}");
                if !legal {
                    assert!(matches!(
                        result,
                        Err(TicketgateError::IllegalTransition { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn self_transition_is_unchanged() {
        assert_eq!(
            plan_transition(TransactionStatus::Settlement, TransactionStatus::Settlement).unwrap(),
            TransitionPlan::Unchanged
        );
        assert_eq!(
            plan_transition(TransactionStatus::Failure, TransactionStatus::Failure).unwrap(),
            TransitionPlan::Unchanged
        );
    }

    #[test]
    fn failure_cannot_become_settlement() {
        let err = plan_transition(TransactionStatus::Failure, TransactionStatus::Settlement)
            .unwrap_err();
        assert!(matches!(
            err,
            TicketgateError::IllegalTransition { from, to } if from == "failure" && to == "settlement"
        ));
    }

    #[test]
    fn refund_only_from_settlement() {
        assert!(plan_transition(TransactionStatus::Settlement, TransactionStatus::Refund).is_ok());
        assert!(plan_transition(TransactionStatus::Pending, TransactionStatus::Refund).is_err());
    }

    #[test]
    fn settlement_cannot_return_to_pending() {
        assert!(plan_transition(TransactionStatus::Settlement, TransactionStatus::Pending).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!is_terminal(TransactionStatus::Pending));
        assert!(!is_terminal(TransactionStatus::Settlement));
        for status in [
            TransactionStatus::Failure,
            TransactionStatus::Expired,
            TransactionStatus::Cancelled,
            TransactionStatus::Denied,
            TransactionStatus::Refund,
        ] {
            assert!(is_terminal(status));
        }
    }

    #[test]
    fn only_settlement_entry_triggers_issuance() {
        let plan = plan_transition(TransactionStatus::Pending, TransactionStatus::Settlement).unwrap();
        assert!(plan.enters_settlement());
        let plan = plan_transition(TransactionStatus::Settlement, TransactionStatus::Refund).unwrap();
        assert!(!plan.enters_settlement());
        assert!(!TransitionPlan::Unchanged.enters_settlement());
    }

    #[test]
    fn apply_stamps_settlement_time_from_gateway_or_clock() {
        let now = Utc::now();
        let gateway_time = now - chrono::Duration::minutes(5);
        let tx = transaction(TransactionStatus::Pending);

        let with_gateway = apply(
            &tx,
            TransactionStatus::Settlement,
            &TransitionFacts {
                settlement_time: Some(gateway_time),
                ..Default::default()
            },
            now,
        );
        assert_eq!(with_gateway.settlement_time, Some(gateway_time));

        let without = apply(&tx, TransactionStatus::Settlement, &TransitionFacts::default(), now);
        assert_eq!(without.settlement_time, Some(now));
    }

    #[test]
    fn apply_records_gateway_facts() {
        let tx = transaction(TransactionStatus::Pending);
        let next = apply(
            &tx,
            TransactionStatus::Settlement,
            &TransitionFacts {
                signature_key: Some("sig".to_string()),
                settlement_time: None,
                payment_type: Some(PaymentType::Qris),
                bank: Some(Bank::Bri),
            },
            Utc::now(),
        );
        assert_eq!(next.status, TransactionStatus::Settlement);
        assert_eq!(next.signature_key.as_deref(), Some("sig"));
        assert_eq!(next.payment_type, PaymentType::Qris);
        assert_eq!(next.bank, Some(Bank::Bri));
        assert_eq!(next.version, tx.version);
    }

    #[test]
    fn apply_non_settlement_leaves_settlement_time() {
        let tx = transaction(TransactionStatus::Pending);
        let next = apply(&tx, TransactionStatus::Expired, &TransitionFacts::default(), Utc::now());
        assert_eq!(next.status, TransactionStatus::Expired);
        assert_eq!(next.settlement_time, None);
    }
}
