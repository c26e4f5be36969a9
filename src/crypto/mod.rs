//! Cryptographic primitives: identity tokens and webhook signatures.

pub mod digest;
pub mod expiry;
pub mod token;
