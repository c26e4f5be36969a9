//! In-memory store backend.
//!
//! One `RwLock` guards all tables, so every write (including the version
//! check in `commit`) is atomic with respect to every other.

use crate::domain::{ArtifactStatus, GuestAttendance, TicketForm, Transaction};
use crate::store::{CommitOutcome, TransactionStore};
use crate::TicketgateError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    transactions: HashMap<Uuid, Transaction>,
    order_index: HashMap<String, Uuid>,
    ticket_forms: HashMap<Uuid, TicketForm>,
    attendance: HashMap<Uuid, GuestAttendance>,
}

/// In-memory [`TransactionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(
        &self,
        mut transaction: Transaction,
        forms: Vec<TicketForm>,
    ) -> Result<(), TicketgateError> {
        let mut tables = self.tables.write().await;

        if tables.order_index.contains_key(&transaction.order_id) {
            return Err(TicketgateError::validation(
                "order_id",
                format!("'{}' already exists", transaction.order_id),
            ));
        }
        if let Some(form) = forms.iter().find(|f| f.transaction_id != transaction.id) {
            return Err(TicketgateError::StoreIO(format!(
                "ticket form {} does not belong to transaction {}",
                form.id, transaction.id
            )));
        }

        transaction.version = 1;
        tables
            .order_index
            .insert(transaction.order_id.clone(), transaction.id);
        for form in forms {
            tables.ticket_forms.insert(form.id, form);
        }
        tables.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Transaction>, TicketgateError> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_index
            .get(order_id)
            .and_then(|id| tables.transactions.get(id))
            .filter(|tx| !tx.is_retired())
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, TicketgateError> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    async fn commit(
        &self,
        updated: &Transaction,
        expected_version: u64,
    ) -> Result<CommitOutcome, TicketgateError> {
        let mut tables = self.tables.write().await;
        let stored = tables.transactions.get_mut(&updated.id).ok_or_else(|| {
            TicketgateError::TransactionNotFound {
                order_id: updated.order_id.clone(),
            }
        })?;

        if stored.version != expected_version {
            return Ok(CommitOutcome::VersionConflict);
        }

        let mut next = updated.clone();
        next.version = expected_version + 1;
        *stored = next;
        Ok(CommitOutcome::Committed(expected_version + 1))
    }

    async fn retire(&self, order_id: &str, at: DateTime<Utc>) -> Result<(), TicketgateError> {
        let mut tables = self.tables.write().await;
        let id = tables.order_index.get(order_id).copied().ok_or_else(|| {
            TicketgateError::TransactionNotFound {
                order_id: order_id.to_string(),
            }
        })?;
        if let Some(tx) = tables.transactions.get_mut(&id) {
            if tx.retired_at.is_none() {
                tx.retired_at = Some(at);
                tx.version += 1;
            }
        }
        Ok(())
    }

    async fn ticket_forms(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<TicketForm>, TicketgateError> {
        let tables = self.tables.read().await;
        let mut forms: Vec<TicketForm> = tables
            .ticket_forms
            .values()
            .filter(|f| f.transaction_id == transaction_id)
            .cloned()
            .collect();
        forms.sort_by_key(|f| f.id);
        Ok(forms)
    }

    async fn find_ticket_form(&self, id: Uuid) -> Result<Option<TicketForm>, TicketgateError> {
        Ok(self.tables.read().await.ticket_forms.get(&id).cloned())
    }

    async fn record_artifact(
        &self,
        ticket_form_id: Uuid,
        status: ArtifactStatus,
    ) -> Result<(), TicketgateError> {
        let mut tables = self.tables.write().await;
        let form = tables
            .ticket_forms
            .get_mut(&ticket_form_id)
            .ok_or_else(|| TicketgateError::TicketFormNotFound(ticket_form_id.to_string()))?;
        form.artifact = status;
        Ok(())
    }

    async fn record_attendance(
        &self,
        attendance: GuestAttendance,
    ) -> Result<(), TicketgateError> {
        let mut tables = self.tables.write().await;
        if !tables.ticket_forms.contains_key(&attendance.ticket_form_id) {
            return Err(TicketgateError::TicketFormNotFound(
                attendance.ticket_form_id.to_string(),
            ));
        }
        if tables.attendance.contains_key(&attendance.ticket_form_id) {
            return Err(TicketgateError::AlreadyCheckedIn(
                attendance.ticket_form_id.to_string(),
            ));
        }
        tables
            .attendance
            .insert(attendance.ticket_form_id, attendance);
        Ok(())
    }

    async fn attendance_for(
        &self,
        ticket_form_id: Uuid,
    ) -> Result<Option<GuestAttendance>, TicketgateError> {
        Ok(self.tables.read().await.attendance.get(&ticket_form_id).cloned())
    }
}
