//! Health pass submission types and the wire contract between client and backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Certificate encoding carried by a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassType {
    /// EU Digital COVID Certificate
    #[serde(rename = "DCC")]
    Dcc,
    /// French 2D-Doc and any other document format
    #[serde(rename = "OTHER_2D_DOC")]
    Other2dDoc,
}

impl std::fmt::Display for PassType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dcc => write!(f, "DCC"),
            Self::Other2dDoc => write!(f, "OTHER_2D_DOC"),
        }
    }
}

impl std::str::FromStr for PassType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DCC" => Ok(Self::Dcc),
            "OTHER_2D_DOC" | "2D-DOC" | "2D_DOC" | "2DDOC" => Ok(Self::Other2dDoc),
            other => Err(format!("Unknown pass type: {other}")),
        }
    }
}

/// Output of the transport encryption, consumed by the assembler.
///
/// Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPassData {
    /// Base64 AES-GCM nonce
    pub iv: String,
    /// Base64 ciphertext (including the GCM tag)
    pub ciphertext: String,
    /// Base64 SPKI encoding of the ephemeral client public key
    pub key: String,
}

impl std::fmt::Debug for EncryptedPassData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedPassData")
            .field("iv_len", &self.iv.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .field("key_len", &self.key.len())
            .finish()
    }
}

/// Ticket record owned by the journey store. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub lastname: String,
    pub firstname: String,
    pub birthdate: NaiveDate,
}

/// Journey record ("dossier voyageur") the ticket belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelFile {
    pub reference: String,
    /// Reference date the certificate must be valid for
    pub travel_date: chrono::DateTime<chrono::FixedOffset>,
}

/// Submission sent from the client to the verification backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthPassRequest {
    pub reference: String,
    /// Ticket holder's last name, as printed on the ticket
    pub name: String,
    pub ticket_id: String,
    pub pass_type: PassType,
    /// Base64 IV immediately followed by base64 ciphertext
    pub pass_content: String,
    /// Base64 SPKI ephemeral public key
    pub public_key: String,
    #[serde(default)]
    pub allow_lastname_mismatch: bool,
}

impl std::fmt::Debug for HealthPassRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthPassRequest")
            .field("reference", &self.reference)
            .field("ticket_id", &self.ticket_id)
            .field("pass_type", &self.pass_type)
            .field("pass_content_len", &self.pass_content.len())
            .field("allow_lastname_mismatch", &self.allow_lastname_mismatch)
            .finish()
    }
}

impl HealthPassRequest {
    /// Assemble a submission from the journey context and an encrypted payload.
    ///
    /// # Errors
    /// Returns validation errors if the journey context is incomplete.
    pub fn assemble(
        travel: &TravelFile,
        ticket: &Ticket,
        pass_type: PassType,
        encrypted: EncryptedPassData,
        allow_lastname_mismatch: bool,
    ) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        if travel.reference.trim().is_empty() {
            errors.push("Travel file reference is missing".to_string());
        }
        if ticket.id.trim().is_empty() {
            errors.push("Ticket id is missing".to_string());
        }
        if encrypted.iv.is_empty() || encrypted.ciphertext.is_empty() || encrypted.key.is_empty()
        {
            errors.push("Encrypted payload is incomplete".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let EncryptedPassData { iv, ciphertext, key } = encrypted;
        Ok(Self {
            reference: travel.reference.clone(),
            name: ticket.lastname.clone(),
            ticket_id: ticket.id.clone(),
            pass_type,
            pass_content: iv + &ciphertext,
            public_key: key,
            allow_lastname_mismatch,
        })
    }
}
