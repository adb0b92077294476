//! Verifier port: Trait for the external certificate verification oracle.
//!
//! The oracle decrypts and decodes the pass on its side; this crate never
//! sees the certificate in clear on the backend.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::domain::VerificationOutcome;

/// HTTP status the oracle uses to report unparseable content.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Transport-level failure reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Verification oracle returned status {status}: {message}")]
pub struct OracleError {
    /// HTTP-style status code
    pub status: u16,
    pub message: String,
}

impl OracleError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The oracle could not parse the certificate content.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }
}

/// One verification entry point of the oracle.
///
/// There is one implementation per certificate encoding (DCC, 2D-Doc); the
/// dispatcher selects between them by pass type.
#[async_trait]
pub trait PassVerifier: Send + Sync {
    /// Verify an encrypted pass for the given reference travel date.
    ///
    /// # Arguments
    /// * `pass_content` - Base64 IV followed by base64 ciphertext
    /// * `public_key` - Base64 SPKI ephemeral client key
    /// * `travel_date` - Date the certificate must be valid for
    ///
    /// # Errors
    /// Returns `OracleError` with the transport status on failure.
    async fn verify(
        &self,
        pass_content: &str,
        public_key: &str,
        travel_date: DateTime<FixedOffset>,
    ) -> Result<VerificationOutcome, OracleError>;
}
