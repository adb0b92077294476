//! Validation service: Backend decision for a submitted health pass.
//!
//! This service coordinates:
//! - A single oracle call through the dispatcher
//! - The identity decision against the ticket

use chrono::{DateTime, FixedOffset};

use crate::domain::{decide, HealthPassError, HealthPassRequest, Ticket};

use super::VerificationDispatcher;

/// Service deciding whether a health pass is acceptable for a ticket.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct ValidationService {
    dispatcher: VerificationDispatcher,
}

impl ValidationService {
    /// Create a new validation service.
    pub fn new(dispatcher: VerificationDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Validate a submission against the ticket it was made for.
    ///
    /// Performs the full pipeline:
    /// 1. Verify the encrypted pass with the oracle (exactly once)
    /// 2. Match the certificate identity and status against the ticket
    ///
    /// # Errors
    /// Returns the terminal `HealthPassError` of the first failing step.
    pub async fn validate_health_pass(
        &self,
        request: &HealthPassRequest,
        travel_date: DateTime<FixedOffset>,
        ticket: &Ticket,
    ) -> Result<(), HealthPassError> {
        tracing::info!(
            pass_type = %request.pass_type,
            reference = %request.reference,
            "Validating health pass"
        );

        let outcome = self.dispatcher.validate(request, travel_date).await?;
        let decision = decide(&outcome, ticket, request.allow_lastname_mismatch);

        match &decision {
            Ok(()) => tracing::info!(reference = %request.reference, "Health pass accepted"),
            Err(e) => tracing::info!(
                reference = %request.reference,
                code = e.code(),
                "Health pass rejected"
            ),
        }

        decision
    }
}
