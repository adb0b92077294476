//! Gateway port: Trait for posting a submission to the verification backend.

use async_trait::async_trait;

use crate::domain::{HealthPassError, HealthPassRequest};

/// Client-side channel to the verification backend.
///
/// Implementations must be cancel-safe: dropping the returned future
/// abandons the call without persisting anything.
#[async_trait]
pub trait HealthPassGateway: Send + Sync {
    /// Submit a health pass and wait for the backend decision.
    ///
    /// # Errors
    /// Returns the backend's `HealthPassError`, or `UnexpectedError` when the
    /// backend could not be reached.
    async fn submit(&self, request: &HealthPassRequest) -> Result<(), HealthPassError>;
}
