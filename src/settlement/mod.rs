//! Transaction status machine and webhook settlement.

pub mod processor;
pub mod transition;

pub use processor::{ArtifactOutcome, SettlementOutcome, SettlementProcessor};
pub use transition::{allowed_transitions, plan_transition, TransitionPlan};
