//! Scannable ticket artifacts.
//!
//! - `payload` - authenticated check-in content encoded in the QR code
//! - `file` - artifact storage (atomic file writes)
//! - `issuer` - render, store and link one artifact per ticket form

pub mod file;
pub mod issuer;
pub mod payload;

pub use file::{ArtifactStore, FileArtifactStore};
pub use issuer::TicketArtifactIssuer;
pub use payload::{CheckInPayload, PayloadSigner};
