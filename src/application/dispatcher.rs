//! Verification dispatcher: routes a submission to the matching oracle entry point.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::domain::{HealthPassError, HealthPassRequest, PassType, VerificationOutcome};
use crate::ports::{OracleError, PassVerifier};

/// Selects the oracle entry point by pass type and maps transport failures.
pub struct VerificationDispatcher {
    dcc: Arc<dyn PassVerifier>,
    two_d_doc: Arc<dyn PassVerifier>,
}

impl VerificationDispatcher {
    /// Create a dispatcher from the DCC and 2D-Doc verifiers.
    pub fn new(dcc: Arc<dyn PassVerifier>, two_d_doc: Arc<dyn PassVerifier>) -> Self {
        Self { dcc, two_d_doc }
    }

    fn verifier_for(&self, pass_type: PassType) -> &dyn PassVerifier {
        match pass_type {
            PassType::Dcc => self.dcc.as_ref(),
            PassType::Other2dDoc => self.two_d_doc.as_ref(),
        }
    }

    /// Call the oracle exactly once for `request`.
    ///
    /// # Errors
    /// `CertificateMalformed` when the oracle reports 404, `UnexpectedError`
    /// for every other transport failure.
    pub async fn validate(
        &self,
        request: &HealthPassRequest,
        travel_date: DateTime<FixedOffset>,
    ) -> Result<VerificationOutcome, HealthPassError> {
        tracing::debug!(
            pass_type = %request.pass_type,
            reference = %request.reference,
            "Dispatching health pass to verification oracle"
        );

        self.verifier_for(request.pass_type)
            .verify(&request.pass_content, &request.public_key, travel_date)
            .await
            .map_err(|e| map_oracle_error(request.pass_type, &e))
    }
}

fn map_oracle_error(pass_type: PassType, err: &OracleError) -> HealthPassError {
    if err.is_not_found() {
        tracing::warn!(%pass_type, status = err.status, "Oracle rejected malformed certificate");
        HealthPassError::CertificateMalformed
    } else {
        tracing::warn!(%pass_type, status = err.status, "Oracle call failed");
        HealthPassError::UnexpectedError
    }
}
