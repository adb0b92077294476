//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the client submission and the backend validation use cases.

mod dispatcher;
mod submission;
mod validation;

pub use dispatcher::VerificationDispatcher;
pub use submission::{
    SubmissionContext, SubmissionHandle, SubmissionProgress, SubmissionService, SubmissionWorker,
};
pub use validation::ValidationService;
