//! Transaction aggregate, ticket forms and attendance records.

use super::enums::{AudienceType, Bank, ItemType, PaymentType, TransactionStatus};
use crate::TicketgateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Gross amount in minor units (hundredths).
///
/// The gateway renders amounts as `"150000.00"`; that exact text is part of
/// the webhook signature, so [`fmt::Display`] reproduces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrossAmount(u64);

impl GrossAmount {
    /// Amount from whole currency units, `None` if it does not fit in minor units.
    pub fn from_units(units: u64) -> Option<Self> {
        units.checked_mul(100).map(Self)
    }

    /// Amount from minor units.
    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Minor units.
    pub fn minor(&self) -> u64 {
        self.0
    }

    /// Parse the gateway's decimal rendering (`"150000"`, `"150000.5"`, `"150000.00"`).
    pub fn parse(raw: &str) -> Result<Self, TicketgateError> {
        let invalid = || TicketgateError::validation("gross_amount", format!("'{raw}' is not an amount"));

        let (whole, fraction) = match raw.trim().split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw.trim(), ""),
        };
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
        {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for GrossAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Transaction aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal ID.
    pub id: Uuid,
    /// Order ID shared with the payment gateway.
    pub order_id: String,
    /// What is being bought.
    pub item_type: ItemType,
    /// Pricing audience.
    pub audience_type: AudienceType,
    /// Optional referral code entered at checkout.
    pub referral_code: Option<String>,
    /// Current status.
    pub status: TransactionStatus,
    /// Payment method.
    pub payment_type: PaymentType,
    /// Acquiring bank, for virtual account payments.
    pub bank: Option<Bank>,
    /// When funds cleared.
    pub settlement_time: Option<DateTime<Utc>>,
    /// Amount charged.
    pub gross_amount: GrossAmount,
    /// Last signature key received from the gateway.
    pub signature_key: Option<String>,
    /// Buyer.
    pub user_id: String,
    /// Ticket, merch or bundle being bought.
    pub item_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft retirement stamp. Retired transactions are never mutated again.
    pub retired_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped by the store on every commit.
    pub version: u64,
}

impl Transaction {
    /// Whether the transaction has been soft-retired.
    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }
}

/// Attendee contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Full name.
    pub full_name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Outcome of artifact issuance for one ticket form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Transaction has not settled yet.
    NotIssued,
    /// Artifact stored and resolvable.
    Issued {
        /// Public URL of the artifact.
        url: String,
    },
    /// Issuance failed after settlement; retry pending.
    Pending {
        /// Why the last attempt failed.
        reason: String,
    },
}

/// One attendee under a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketForm {
    /// Ticket form ID; also names the artifact file.
    pub id: Uuid,
    /// Owning transaction.
    pub transaction_id: Uuid,
    /// Attendee contact details.
    pub contact: Contact,
    /// Artifact issuance outcome.
    pub artifact: ArtifactStatus,
}

/// A redeemed artifact at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestAttendance {
    /// Attendance ID.
    pub id: Uuid,
    /// Ticket form that was checked in.
    pub ticket_form_id: Uuid,
    /// Subject of the staff token that performed the check-in.
    pub checked_in_by: String,
    /// Check-in time.
    pub checked_in_at: DateTime<Utc>,
}

/// Purchase intent as submitted by a client. Enum fields are still raw text.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    /// `ticket`, `merch` or `bundle`.
    pub item_type: String,
    /// Item being bought.
    pub item_id: String,
    /// Pricing audience.
    pub audience_type: String,
    /// Payment method.
    pub payment_type: String,
    /// Acquiring bank, for bank transfers.
    #[serde(default)]
    pub bank: Option<String>,
    /// Referral code.
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Amount in whole currency units.
    pub gross_amount: u64,
    /// One entry per attendee.
    pub attendees: Vec<Contact>,
}

/// A purchase intent whose fields have all been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Item type.
    pub item_type: ItemType,
    /// Item being bought.
    pub item_id: String,
    /// Pricing audience.
    pub audience_type: AudienceType,
    /// Payment method.
    pub payment_type: PaymentType,
    /// Acquiring bank.
    pub bank: Option<Bank>,
    /// Referral code, blank normalized away.
    pub referral_code: Option<String>,
    /// Amount charged.
    pub gross_amount: GrossAmount,
    /// Attendees.
    pub attendees: Vec<Contact>,
}

impl PurchaseRequest {
    /// Check every field, reporting the first violation by name.
    pub fn validate(self) -> Result<NewPurchase, TicketgateError> {
        let item_type = self.item_type.parse::<ItemType>()?;
        let audience_type = self.audience_type.parse::<AudienceType>()?;
        let payment_type = self.payment_type.parse::<PaymentType>()?;
        let bank = self
            .bank
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .map(str::parse::<Bank>)
            .transpose()?;

        if self.item_id.trim().is_empty() {
            return Err(TicketgateError::validation("item_id", "cannot be empty"));
        }
        if self.gross_amount == 0 {
            return Err(TicketgateError::validation("gross_amount", "must be positive"));
        }
        let gross_amount = GrossAmount::from_units(self.gross_amount).ok_or_else(|| {
            TicketgateError::validation(
                "gross_amount",
                format!("{} is too large", self.gross_amount),
            )
        })?;
        if self.attendees.is_empty() {
            return Err(TicketgateError::validation(
                "attendees",
                "at least one attendee is required",
            ));
        }
        for attendee in &self.attendees {
            if attendee.full_name.trim().is_empty() {
                return Err(TicketgateError::validation("full_name", "cannot be empty"));
            }
            if !attendee.email.contains('@') {
                return Err(TicketgateError::validation(
                    "email",
                    format!("'{}' is not an email address", attendee.email),
                ));
            }
        }

        Ok(NewPurchase {
            item_type,
            item_id: self.item_id,
            audience_type,
            payment_type,
            bank,
            referral_code: self.referral_code.filter(|c| !c.trim().is_empty()),
            gross_amount,
            attendees: self.attendees,
        })
    }
}
