//! Key types for the pass transport encryption.
//!
//! Wrappers around `p256` keys with additional safety guarantees.
//!
//! # Memory Security
//!
//! The server secret key implements `ZeroizeOnDrop` so that its scalar bytes
//! are erased when no longer needed. Neither key type exposes key bytes
//! through `Debug`; only a SHA-256 fingerprint is shown.

use base64::engine::general_purpose;
use base64::Engine;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use p256::{PublicKey, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Error type for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key agreement failed: {0}")]
    KeyAgreement(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Invalid payload encoding: {0}")]
    InvalidEncoding(String),
}

/// The verification backend's long-lived P-256 public key.
///
/// Read-only configuration shared by every submission.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerPublicKey {
    pub(crate) inner: PublicKey,

    /// Key fingerprint for identification (NOT secret)
    pub fingerprint: String,
}

impl ServerPublicKey {
    /// Import a key from its base64 SPKI DER encoding.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyFormat` if the value is not a P-256 SPKI key.
    pub fn from_base64_spki(encoded: &str) -> Result<Self, CryptoError> {
        let der = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid base64: {e}")))?;
        let inner = PublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    pub(crate) fn from_inner(inner: PublicKey) -> Self {
        let fingerprint = spki_fingerprint(&inner);
        Self { inner, fingerprint }
    }

    /// Export the key as base64 SPKI DER.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyFormat` if DER encoding fails.
    pub fn to_base64_spki(&self) -> Result<String, CryptoError> {
        export_spki(&self.inner)
    }
}

impl std::fmt::Debug for ServerPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerPublicKey")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// The verification backend's secret key.
///
/// Only the verification side holds this key; clients never see it.
///
/// # Security
///
/// - Implements `ZeroizeOnDrop`: the scalar bytes are erased when dropped
/// - `Debug` implementation does NOT expose key bytes
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServerSecretKey {
    /// Big-endian scalar bytes
    pub(crate) scalar: Vec<u8>,

    /// Fingerprint of the matching public key (NOT secret)
    #[zeroize(skip)]
    pub fingerprint: String,
}

impl ServerSecretKey {
    /// Generate a fresh secret key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        Self::from_inner(&secret)
    }

    /// Import a key from its base64 PKCS#8 DER encoding.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyFormat` if the value is not a P-256 PKCS#8 key.
    pub fn from_base64_pkcs8(encoded: &str) -> Result<Self, CryptoError> {
        let der = Zeroizing::new(
            general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid base64: {e}")))?,
        );
        let secret = SecretKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_inner(&secret))
    }

    fn from_inner(secret: &SecretKey) -> Self {
        Self {
            scalar: secret.to_bytes().to_vec(),
            fingerprint: spki_fingerprint(&secret.public_key()),
        }
    }

    pub(crate) fn secret_key(&self) -> Result<SecretKey, CryptoError> {
        SecretKey::from_slice(&self.scalar)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    /// Export the key as base64 PKCS#8 DER.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyFormat` if DER encoding fails.
    pub fn to_base64_pkcs8(&self) -> Result<Zeroizing<String>, CryptoError> {
        let doc = self
            .secret_key()?
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Zeroizing::new(general_purpose::STANDARD.encode(doc.as_bytes())))
    }

    /// The matching public key, as handed out to clients.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyFormat` if the stored scalar is invalid.
    pub fn public_key(&self) -> Result<ServerPublicKey, CryptoError> {
        Ok(ServerPublicKey::from_inner(self.secret_key()?.public_key()))
    }
}

impl std::fmt::Debug for ServerSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSecretKey")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

pub(crate) fn export_spki(key: &PublicKey) -> Result<String, CryptoError> {
    let doc = key
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
    Ok(general_purpose::STANDARD.encode(doc.as_bytes()))
}

fn spki_fingerprint(key: &PublicKey) -> String {
    match key.to_public_key_der() {
        Ok(doc) => compute_fingerprint(doc.as_bytes()),
        Err(_) => compute_fingerprint(&key.to_sec1_bytes()),
    }
}

/// Compute a fingerprint for key identification using SHA-256.
pub fn compute_fingerprint(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(bytes);

    // First 8 bytes (64 bits) are enough to tell keys apart in logs
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_debug_no_leak() {
        let key = ServerSecretKey::generate();
        let debug_output = format!("{key:?}");
        let scalar_hex: String = key.scalar.iter().map(|b| format!("{b:02x}")).collect();

        assert!(!debug_output.contains(&scalar_hex));
        assert!(debug_output.contains("fingerprint"));
    }

    #[test]
    fn test_spki_roundtrip_keeps_fingerprint() {
        let secret = ServerSecretKey::generate();
        let public = secret.public_key().expect("Should derive public key");
        let encoded = public.to_base64_spki().expect("Should export");

        let imported = ServerPublicKey::from_base64_spki(&encoded).expect("Should import");
        assert_eq!(imported, public);
        assert_eq!(imported.fingerprint, secret.fingerprint);
    }

    #[test]
    fn test_pkcs8_roundtrip() {
        let secret = ServerSecretKey::generate();
        let encoded = secret.to_base64_pkcs8().expect("Should export");
        let restored = ServerSecretKey::from_base64_pkcs8(&encoded).expect("Should import");

        assert_eq!(restored.scalar, secret.scalar);
    }

    #[test]
    fn test_rejects_garbage_public_key() {
        assert!(matches!(
            ServerPublicKey::from_base64_spki("not base64!"),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            ServerPublicKey::from_base64_spki("AAAA"),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_fingerprint_is_hash_prefix() {
        let fp = compute_fingerprint(&[0xde, 0xad, 0xbe, 0xef]);
        assert_ne!(fp, "deadbeef");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, compute_fingerprint(&[0xde, 0xad, 0xbe, 0xef]));
    }
}
