//! Submission service: Client-side encryption and submission of a health pass.
//!
//! This service coordinates:
//! - Transport encryption for the server key
//! - Request assembly from the journey context
//! - A single call to the verification backend
//!
//! `SubmissionWorker` runs the same pipeline on a background task and
//! reports progress, so a caller can abandon it mid-flight.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::domain::{
    encrypt_pass, HealthPassError, HealthPassRequest, PassType, ServerPublicKey, Ticket,
    TravelFile,
};
use crate::ports::HealthPassGateway;
use crate::Error;

/// Journey context a certificate is submitted for.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub travel: TravelFile,
    pub ticket: Ticket,
    pub pass_type: PassType,
    pub allow_lastname_mismatch: bool,
}

/// Service for encrypting and submitting health passes.
pub struct SubmissionService<G>
where
    G: HealthPassGateway,
{
    server_key: ServerPublicKey,
    gateway: Arc<G>,
}

impl<G> SubmissionService<G>
where
    G: HealthPassGateway,
{
    /// Create a new submission service.
    pub fn new(server_key: ServerPublicKey, gateway: Arc<G>) -> Self {
        Self {
            server_key,
            gateway,
        }
    }

    /// Encrypt `certificate` and assemble the request for `context`.
    ///
    /// # Errors
    /// `Error::Validation` if the journey context is incomplete,
    /// `HealthPassError::UnexpectedError` if encryption fails.
    pub fn prepare(
        &self,
        certificate: &str,
        context: &SubmissionContext,
    ) -> Result<HealthPassRequest, Error> {
        let encrypted = encrypt_pass(certificate, &self.server_key).map_err(|e| {
            tracing::error!("Health pass encryption failed: {e}");
            Error::Rejected(HealthPassError::UnexpectedError)
        })?;

        HealthPassRequest::assemble(
            &context.travel,
            &context.ticket,
            context.pass_type,
            encrypted,
            context.allow_lastname_mismatch,
        )
        .map_err(|errors| Error::Validation(errors.join("; ")))
    }

    /// Encrypt, assemble and submit a health pass.
    ///
    /// # Errors
    /// Returns the backend decision as `Error::Rejected`, or a
    /// validation error if the request could not be built.
    pub async fn submit(
        &self,
        certificate: &str,
        context: &SubmissionContext,
    ) -> Result<(), Error> {
        let request = self.prepare(certificate, context)?;

        tracing::info!(
            pass_type = %request.pass_type,
            reference = %request.reference,
            "Submitting health pass"
        );
        self.gateway.submit(&request).await?;
        Ok(())
    }
}

/// Progress updates from a submission worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionProgress {
    /// Encrypting the certificate
    Encrypting,
    /// Request sent, waiting for the backend decision
    Sending,
    /// The backend accepted the health pass
    Accepted,
    /// The backend (or encryption) rejected the health pass
    Rejected(HealthPassError),
    /// The request could not be built
    Failed(String),
}

/// Handle to a running submission.
pub struct SubmissionHandle {
    progress_rx: UnboundedReceiver<SubmissionProgress>,
    handle: JoinHandle<()>,
}

impl SubmissionHandle {
    /// Try to receive the next progress update (non-blocking).
    pub fn try_recv(&mut self) -> Option<SubmissionProgress> {
        self.progress_rx.try_recv().ok()
    }

    /// Wait for the next progress update.
    ///
    /// Returns `None` once the submission has finished or was cancelled.
    pub async fn recv(&mut self) -> Option<SubmissionProgress> {
        self.progress_rx.recv().await
    }

    /// Abandon the submission, dropping any in-flight backend call.
    ///
    /// Updates queued before the call are discarded too, so a cancelled
    /// submission never reports `Accepted`.
    pub fn cancel(&mut self) {
        tracing::info!("Cancelling health pass submission");
        self.handle.abort();
        self.progress_rx.close();
        while self.progress_rx.try_recv().is_ok() {}
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Worker that runs a submission on a background task.
pub struct SubmissionWorker;

impl SubmissionWorker {
    /// Spawn a background submission.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<G>(
        service: Arc<SubmissionService<G>>,
        certificate: String,
        context: SubmissionContext,
    ) -> SubmissionHandle
    where
        G: HealthPassGateway + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            Self::run_with_progress(service, certificate, context, tx).await;
        });

        SubmissionHandle {
            progress_rx: rx,
            handle,
        }
    }

    async fn run_with_progress<G>(
        service: Arc<SubmissionService<G>>,
        certificate: String,
        context: SubmissionContext,
        tx: UnboundedSender<SubmissionProgress>,
    ) where
        G: HealthPassGateway + 'static,
    {
        let _ = tx.send(SubmissionProgress::Encrypting);

        let request = match service.prepare(&certificate, &context) {
            Ok(request) => request,
            Err(Error::Rejected(e)) => {
                let _ = tx.send(SubmissionProgress::Rejected(e));
                return;
            }
            Err(e) => {
                let _ = tx.send(SubmissionProgress::Failed(e.to_string()));
                return;
            }
        };
        drop(certificate);

        let _ = tx.send(SubmissionProgress::Sending);

        let progress = match service.gateway.submit(&request).await {
            Ok(()) => SubmissionProgress::Accepted,
            Err(e) => SubmissionProgress::Rejected(e),
        };
        let _ = tx.send(progress);
    }
}
