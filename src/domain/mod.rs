//! Domain records and closed value sets.

pub mod enums;
pub mod records;

pub use enums::{AudienceType, Bank, ItemType, PaymentType, Role, TransactionStatus};
pub use records::{
    ArtifactStatus, Contact, GrossAmount, GuestAttendance, NewPurchase, PurchaseRequest,
    TicketForm, Transaction,
};
