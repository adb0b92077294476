//! Local verifier adapter: `PassVerifier` backed by the server secret key.
//!
//! Stands in for the remote verification oracle in development setups and
//! end-to-end tests. It decrypts the pass itself and reads the plaintext as
//! an already-decoded certificate document (JSON):
//!
//! ```json
//! {
//!   "lastName": "Dupont",
//!   "firstName": "Marie",
//!   "dateOfBirth": "1990-05-01",
//!   "validityStatus": "VALID",
//!   "validUntil": "2021-12-31T23:59:59+00:00"
//! }
//! ```
//!
//! Decryption or parsing failures are reported with status 404, exactly
//! like the remote oracle reports unparseable content.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;

use crate::domain::{
    compute_fingerprint, decrypt_pass, CertificateIdentity, ServerSecretKey, ValidityStatus,
    VerificationOutcome,
};
use crate::ports::{OracleError, PassVerifier, STATUS_NOT_FOUND};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalCertificate {
    last_name: String,
    first_name: String,
    date_of_birth: NaiveDate,
    validity_status: ValidityStatus,
    #[serde(default)]
    valid_until: Option<DateTime<FixedOffset>>,
}

/// Verifier that decrypts passes locally with the server secret key.
#[derive(Debug)]
pub struct DecryptingVerifier {
    secret: ServerSecretKey,
    /// Fingerprints of revoked certificate plaintexts
    blacklist: HashSet<String>,
}

impl DecryptingVerifier {
    /// Create a verifier holding `secret`.
    #[must_use]
    pub fn new(secret: ServerSecretKey) -> Self {
        tracing::info!(server_key = %secret.fingerprint, "Initializing local verifier");
        Self {
            secret,
            blacklist: HashSet::new(),
        }
    }

    /// Mark a certificate (by its plaintext) as revoked.
    #[must_use]
    pub fn with_blacklisted(mut self, certificate: &str) -> Self {
        self.blacklist.insert(compute_fingerprint(certificate.as_bytes()));
        self
    }
}

#[async_trait]
impl PassVerifier for DecryptingVerifier {
    async fn verify(
        &self,
        pass_content: &str,
        public_key: &str,
        travel_date: DateTime<FixedOffset>,
    ) -> Result<VerificationOutcome, OracleError> {
        let plaintext = decrypt_pass(pass_content, public_key, &self.secret).map_err(|e| {
            tracing::debug!("Local verifier could not decrypt pass: {e}");
            OracleError::new(STATUS_NOT_FOUND, "content could not be decrypted")
        })?;

        let certificate: LocalCertificate = serde_json::from_str(&plaintext).map_err(|e| {
            tracing::debug!("Local verifier could not parse certificate: {e}");
            OracleError::new(STATUS_NOT_FOUND, "content could not be parsed")
        })?;

        let expired = certificate
            .valid_until
            .is_some_and(|valid_until| travel_date > valid_until);
        let validity_status = match certificate.validity_status {
            ValidityStatus::Valid if expired => ValidityStatus::Other,
            status => status,
        };

        Ok(VerificationOutcome {
            identity: CertificateIdentity {
                last_name: certificate.last_name,
                first_name: certificate.first_name,
                date_of_birth: certificate.date_of_birth,
                validity_status,
            },
            is_blacklisted: self
                .blacklist
                .contains(&compute_fingerprint(plaintext.as_bytes())),
        })
    }
}
