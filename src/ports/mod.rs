//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (verification oracle,
//! verification backend).

mod gateway;
mod verifier;

pub use gateway::HealthPassGateway;
pub use verifier::{OracleError, PassVerifier, STATUS_NOT_FOUND};
