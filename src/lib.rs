//! # Ticketgate
//!
//! **Access control and payment settlement for an event-ticketing backend.**
//!
//! Ticketgate issues and verifies HS256 bearer tokens, gates routes by role,
//! and turns payment gateway webhooks into transaction state changes. When a
//! transaction settles, every attendee gets a scannable QR artifact whose
//! payload is HMAC-tagged so the venue can redeem it exactly once.
//!
//! ## Features
//!
//! - **Identity tokens** - HS256, single accepted algorithm, constant-time MAC check
//! - **Role gate** - 401 for identity failures, 403 for the wrong role
//! - **Webhook authentication** - SHA-512 signature over order, status, amount and server key
//! - **Transition table** - illegal moves rejected, redeliveries are no-ops
//! - **Optimistic concurrency** - versioned commits with bounded re-read
//! - **Artifacts** - QR SVG per attendee, atomic writes, pending-on-failure with retry
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticketgate::{MemoryStore, PaymentManager, TicketgateConfig};
//!
//! # async fn run() -> Result<(), ticketgate::TicketgateError> {
//! let config = TicketgateConfig::from_env()?;
//! let artifact_dir = config.artifact_dir.clone();
//! let manager = Arc::new(PaymentManager::new(config, Arc::new(MemoryStore::new()))?);
//! let app = ticketgate::http::router(manager, artifact_dir);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threat Model
//!
//! Ticketgate protects against:
//! - **Forged webhooks** - unsigned or mis-signed notifications never reach the state machine
//! - **Algorithm substitution** - tokens naming `none` or any other algorithm are refused
//! - **Ticket forgery** - artifact payloads carry a MAC keyed by the server secret
//! - **Double redemption** - one attendance per ticket form
//!
//! It does **not** protect a leaked server key or signing secret.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Domain
pub mod domain;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Storage
pub mod store;

// Settlement and artifacts
pub mod artifact;
pub mod settlement;

// Policy layer
pub mod policy;

// Manager (main public API)
pub mod manager;

// HTTP surface
pub mod http;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::{Secret, TicketgateConfig};
pub use crypto::token::{Claims, TokenCodec};
pub use domain::{Role, TransactionStatus};
pub use errors::TicketgateError;
pub use manager::{PaymentManager, PurchaseReceipt};
pub use policy::AccessError;
pub use protocol::PaymentNotification;
pub use settlement::SettlementOutcome;
pub use store::{MemoryStore, TransactionStore};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
