//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the integrations that live in this crate:
//! - `local_verifier`: verification oracle stand-in holding the server key
//! - `sanitize`: sensitive-data filtering for logs

pub mod local_verifier;
pub mod sanitize;

pub use local_verifier::DecryptingVerifier;
