//! Key-indexed record store.
//!
//! The persistence engine is external; this trait is the whole contract the
//! core relies on. Row contention is handled optimistically: `commit` only
//! succeeds when the stored version still equals the version the caller read.

pub mod memory;

use crate::domain::{ArtifactStatus, GuestAttendance, TicketForm, Transaction};
use crate::TicketgateError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;

/// Outcome of an optimistic commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written; carries the new version.
    Committed(u64),
    /// Someone else committed first; re-read and re-evaluate.
    VersionConflict,
}

/// Storage for transactions, their ticket forms and attendance records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new transaction with its ticket forms, atomically.
    async fn insert(
        &self,
        transaction: Transaction,
        forms: Vec<TicketForm>,
    ) -> Result<(), TicketgateError>;

    /// Live (not retired) transaction by order ID.
    async fn find_by_order_id(&self, order_id: &str)
        -> Result<Option<Transaction>, TicketgateError>;

    /// Transaction by internal ID, retired or not.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, TicketgateError>;

    /// Replace the stored row if its version is still `expected_version`.
    ///
    /// Status, settlement time and gateway facts are written together.
    async fn commit(
        &self,
        updated: &Transaction,
        expected_version: u64,
    ) -> Result<CommitOutcome, TicketgateError>;

    /// Soft-retire a transaction.
    async fn retire(&self, order_id: &str, at: DateTime<Utc>) -> Result<(), TicketgateError>;

    /// Ticket forms under a transaction.
    async fn ticket_forms(&self, transaction_id: Uuid)
        -> Result<Vec<TicketForm>, TicketgateError>;

    /// Ticket form by ID.
    async fn find_ticket_form(&self, id: Uuid) -> Result<Option<TicketForm>, TicketgateError>;

    /// Record the artifact outcome for a ticket form.
    async fn record_artifact(
        &self,
        ticket_form_id: Uuid,
        status: ArtifactStatus,
    ) -> Result<(), TicketgateError>;

    /// Record a check-in. Fails with `AlreadyCheckedIn` when the ticket form
    /// already has one.
    async fn record_attendance(&self, attendance: GuestAttendance)
        -> Result<(), TicketgateError>;

    /// Attendance for a ticket form, if checked in.
    async fn attendance_for(
        &self,
        ticket_form_id: Uuid,
    ) -> Result<Option<GuestAttendance>, TicketgateError>;
}
