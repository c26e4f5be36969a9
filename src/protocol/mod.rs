//! Inbound payment gateway wire formats.

pub mod notification;

pub use notification::{PaymentNotification, VaNumber};
