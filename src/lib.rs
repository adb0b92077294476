//! # healthpass
//!
//! End-to-end encrypted health pass submission and ticket-holder verification.
//!
//! This crate provides:
//! - Client-side transport encryption of a certificate for the verification
//!   backend (ephemeral ECDH P-256, HMAC-derived AES-256-GCM key)
//! - Assembly of the submission sent to the backend
//! - Backend dispatch to the verification oracle and the identity decision
//!   against the traveller's ticket
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure logic (encryption, wire types, decision)
//! - `ports`: Trait definitions for the oracle and the backend gateway
//! - `adapters`: Concrete implementations (local verifier, log sanitizer)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{HealthPassError, HealthPassRequest, PassType, Ticket, VerificationOutcome};

/// Result type for healthpass operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for healthpass
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Health pass rejected: {0}")]
    Rejected(#[from] HealthPassError),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(#[from] domain::CryptoError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
