//! Access policy.

pub mod access;

pub use access::{authorize, AccessError};
