//! Key agreement and transport encryption for health pass payloads.
//!
//! This module provides:
//! - ECDH (P-256) between a fresh ephemeral client key and the server key
//! - Content key derivation: HMAC-SHA-256 over a fixed label, keyed by the
//!   ECDH shared secret, used directly as an AES-256-GCM key
//! - AES-256-GCM with a 16-byte nonce, no associated data
//!
//! The server holds the only counterpart able to decrypt (`decrypt_pass`).
//!
//! # Security
//!
//! - A new ephemeral keypair and a new random IV for every payload
//! - The derivation is a single HMAC over a constant, not a dedicated KDF;
//!   it is kept as-is for wire compatibility with deployed clients

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use p256::ecdh::EphemeralSecret;
use p256::pkcs8::DecodePublicKey;
use p256::PublicKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::crypto::{export_spki, CryptoError, ServerPublicKey, ServerSecretKey};
use super::pass::EncryptedPassData;

/// Label signed with the ECDH-derived HMAC key to obtain the content key.
pub const CONVERSION_LABEL: &[u8] = b"conversion";

/// Size of the AES-GCM nonce in bytes.
pub const IV_LEN: usize = 16;

/// Length of the base64-encoded IV prefix inside `passContent`.
pub const ENCODED_IV_LEN: usize = 24;

type Aes256Gcm16 = AesGcm<Aes256, U16>;
type HmacSha256 = Hmac<Sha256>;

/// Derive the AES-256-GCM content key from an ECDH shared secret.
fn derive_content_key(shared_secret: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(shared_secret)
        .map_err(|e| CryptoError::KeyAgreement(format!("Invalid HMAC key: {e}")))?;
    mac.update(CONVERSION_LABEL);

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

fn content_cipher(shared_secret: &[u8]) -> Result<Aes256Gcm16, CryptoError> {
    let key = derive_content_key(shared_secret)?;
    Aes256Gcm16::new_from_slice(&key[..])
        .map_err(|e| CryptoError::KeyAgreement(format!("Invalid content key: {e}")))
}

/// Generate a fresh random IV.
fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt a certificate payload for the verification backend.
///
/// Generates an ephemeral P-256 keypair, agrees a shared secret with
/// `server_key`, derives the content key and encrypts `plaintext` with
/// AES-256-GCM. The ephemeral secret is dropped before returning.
///
/// # Errors
/// Returns a `CryptoError` if any provider step fails. No partial result is
/// ever returned.
pub fn encrypt_pass(
    plaintext: &str,
    server_key: &ServerPublicKey,
) -> Result<EncryptedPassData, CryptoError> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let exported_key = export_spki(&ephemeral.public_key())?;

    let shared = ephemeral.diffie_hellman(&server_key.inner);
    let cipher = content_cipher(shared.raw_secret_bytes().as_slice())?;

    let iv = generate_iv();
    let ciphertext = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    tracing::debug!(
        server_key = %server_key.fingerprint,
        ciphertext_len = ciphertext.len(),
        "Encrypted health pass payload"
    );

    Ok(EncryptedPassData {
        iv: general_purpose::STANDARD.encode(iv),
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
        key: exported_key,
    })
}

/// Decrypt a `passContent` value on the verification side.
///
/// `pass_content` is the base64 IV immediately followed by the base64
/// ciphertext; `client_public_key` is the base64 SPKI ephemeral key sent with
/// the request.
///
/// # Errors
/// Returns `CryptoError::InvalidEncoding` or `CryptoError::InvalidKeyFormat`
/// for malformed inputs and `CryptoError::Decryption` if the payload was
/// tampered with or encrypted for another key.
pub fn decrypt_pass(
    pass_content: &str,
    client_public_key: &str,
    server_key: &ServerSecretKey,
) -> Result<Zeroizing<String>, CryptoError> {
    if pass_content.len() <= ENCODED_IV_LEN || !pass_content.is_char_boundary(ENCODED_IV_LEN) {
        return Err(CryptoError::InvalidEncoding(
            "pass content too short".to_string(),
        ));
    }
    let (iv_b64, ciphertext_b64) = pass_content.split_at(ENCODED_IV_LEN);

    let iv = general_purpose::STANDARD
        .decode(iv_b64)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Invalid IV base64: {e}")))?;
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidEncoding(format!(
            "IV must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let ciphertext = general_purpose::STANDARD
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Invalid ciphertext base64: {e}")))?;

    let client_der = general_purpose::STANDARD
        .decode(client_public_key.trim())
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("Invalid base64: {e}")))?;
    let client_key = PublicKey::from_public_key_der(&client_der)
        .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;

    let secret = server_key.secret_key()?;
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), client_key.as_affine());
    let cipher = content_cipher(shared.raw_secret_bytes().as_slice())?;

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decryption)?,
    );

    let text = std::str::from_utf8(&plaintext)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Plaintext is not UTF-8: {e}")))?;
    Ok(Zeroizing::new(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERTIFICATE: &str = "HC1:6BFOXN%TSMAHN-HWWK2RL99TEZP3Z9M52N651WGRJPTW G%%4";

    fn server_keys() -> (ServerSecretKey, ServerPublicKey) {
        let secret = ServerSecretKey::generate();
        let public = secret.public_key().expect("Should derive public key");
        (secret, public)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (secret, public) = server_keys();

        let encrypted = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");
        let content = format!("{}{}", encrypted.iv, encrypted.ciphertext);
        let decrypted =
            decrypt_pass(&content, &encrypted.key, &secret).expect("Decryption should succeed");

        assert_eq!(decrypted.as_str(), CERTIFICATE);
    }

    #[test]
    fn test_roundtrip_non_ascii_and_empty() {
        let (secret, public) = server_keys();

        for plaintext in ["", "DC04FR0000011E6A1E6AB201FRF0MÜLLER-DUPONT", "é\u{1F600}"] {
            let encrypted = encrypt_pass(plaintext, &public).expect("Encryption should succeed");
            let content = format!("{}{}", encrypted.iv, encrypted.ciphertext);
            let decrypted = decrypt_pass(&content, &encrypted.key, &secret)
                .expect("Decryption should succeed");
            assert_eq!(decrypted.as_str(), plaintext);
        }
    }

    #[test]
    fn test_fresh_key_and_iv_per_call() {
        let (_secret, public) = server_keys();

        let first = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");
        let second = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn test_iv_encoding_is_fixed_width() {
        let (_secret, public) = server_keys();
        let encrypted = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");

        assert_eq!(encrypted.iv.len(), ENCODED_IV_LEN);
        let raw = general_purpose::STANDARD
            .decode(&encrypted.iv)
            .expect("IV should be base64");
        assert_eq!(raw.len(), IV_LEN);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (secret, public) = server_keys();
        let encrypted = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");

        let mut raw = general_purpose::STANDARD
            .decode(&encrypted.ciphertext)
            .expect("Ciphertext should be base64");
        raw[0] ^= 0x01;
        let content = format!("{}{}", encrypted.iv, general_purpose::STANDARD.encode(raw));

        let result = decrypt_pass(&content, &encrypted.key, &secret);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_wrong_server_key_fails() {
        let (_secret, public) = server_keys();
        let (other_secret, _) = server_keys();
        let encrypted = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");
        let content = format!("{}{}", encrypted.iv, encrypted.ciphertext);

        let result = decrypt_pass(&content, &encrypted.key, &other_secret);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_malformed_content_rejected() {
        let (secret, public) = server_keys();
        let encrypted = encrypt_pass(CERTIFICATE, &public).expect("Encryption should succeed");

        assert!(matches!(
            decrypt_pass("short", &encrypted.key, &secret),
            Err(CryptoError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decrypt_pass(
                &format!("{}{}", encrypted.iv, encrypted.ciphertext),
                "bm90IGEga2V5",
                &secret
            ),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_content_key_is_deterministic() {
        let a = derive_content_key(&[7u8; 32]).expect("Should derive");
        let b = derive_content_key(&[7u8; 32]).expect("Should derive");
        let c = derive_content_key(&[8u8; 32]).expect("Should derive");

        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }
}
