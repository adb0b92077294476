//! Verification oracle outcome and the terminal results of a health pass check.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::crypto::CryptoError;

/// Validity status reported by the verification oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidityStatus {
    Valid,
    Fraudulent,
    /// Expired, not yet valid, unknown, ...
    #[serde(other)]
    Other,
}

/// Identity printed on the certificate, as decoded by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateIdentity {
    pub last_name: String,
    pub first_name: String,
    pub date_of_birth: NaiveDate,
    pub validity_status: ValidityStatus,
}

/// Answer of the verification oracle for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub identity: CertificateIdentity,
    pub is_blacklisted: bool,
}

/// Why a health pass was rejected.
///
/// Every variant is terminal; nothing is retried automatically. Name fields
/// carry the normalized comparison keys, not the display forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthPassError {
    #[error("Certificate content is malformed")]
    CertificateMalformed,

    #[error("Unexpected error during verification")]
    UnexpectedError,

    #[error("Last name does not match the ticket (expected {expected}, got {actual})")]
    LastnameNotMatching { expected: String, actual: String },

    #[error("First name does not match the ticket (expected {expected}, got {actual})")]
    FirstnameNotMatching { expected: String, actual: String },

    #[error("Birth date does not match the ticket (expected {expected}, got {actual})")]
    BirthdateNotMatching {
        expected: NaiveDate,
        actual: NaiveDate,
    },

    #[error("Health pass is blacklisted")]
    HealthPassBlacklisted,

    #[error("Health pass is not valid")]
    HealthPassNotValid,
}

impl HealthPassError {
    /// Stable machine-readable code, as sent on the wire.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CertificateMalformed => "CERTIFICATE_MALFORMED",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
            Self::LastnameNotMatching { .. } => "LASTNAME_NOT_MATCHING",
            Self::FirstnameNotMatching { .. } => "FIRSTNAME_NOT_MATCHING",
            Self::BirthdateNotMatching { .. } => "BIRTHDATE_NOT_MATCHING",
            Self::HealthPassBlacklisted => "HEALTH_PASS_BLACKLISTED",
            Self::HealthPassNotValid => "HEALTH_PASS_NOT_VALID",
        }
    }

    /// Whether the holder can fix this by scanning another certificate.
    #[must_use]
    pub fn is_identity_mismatch(&self) -> bool {
        matches!(
            self,
            Self::LastnameNotMatching { .. }
                | Self::FirstnameNotMatching { .. }
                | Self::BirthdateNotMatching { .. }
        )
    }
}

impl From<CryptoError> for HealthPassError {
    fn from(_: CryptoError) -> Self {
        Self::UnexpectedError
    }
}
