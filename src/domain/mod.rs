//! Domain layer: Core business types and logic.
//!
//! This module contains the transport encryption, the submission wire
//! types and the identity decision. Nothing here performs I/O.

mod crypto;
pub mod identity;
pub mod key_agreement;
mod pass;
mod verification;

pub use crypto::{compute_fingerprint, CryptoError, ServerPublicKey, ServerSecretKey};
pub use identity::{decide, normalize_name};
pub use key_agreement::{decrypt_pass, encrypt_pass};
pub use pass::{EncryptedPassData, HealthPassRequest, PassType, Ticket, TravelFile};
pub use verification::{CertificateIdentity, HealthPassError, ValidityStatus, VerificationOutcome};
