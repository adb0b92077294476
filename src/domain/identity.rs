//! Identity matching between a ticket and a verified certificate.
//!
//! The decision is a pure function of the oracle outcome, the ticket and the
//! lastname bypass flag; it performs no I/O.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::pass::Ticket;
use super::verification::{HealthPassError, ValidityStatus, VerificationOutcome};

/// Canonical comparison key for a person's name.
///
/// Strips diacritics, trims, uppercases and turns hyphens into spaces.
/// Only used for comparison, never for display or storage.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    // Uppercase before decomposing: some uppercase forms carry combining marks.
    let key: String = name
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_letter)
        .collect();
    key.trim().to_string()
}

/// Letters with a stroke have no NFD decomposition.
fn fold_letter(c: char) -> char {
    match c {
        'Ł' => 'L',
        'Ø' => 'O',
        'Đ' => 'D',
        '-' => ' ',
        other => other,
    }
}

/// Decide whether a verified certificate is acceptable for `ticket`.
///
/// Rules are evaluated in priority order; the first one that applies wins:
/// 1. last name mismatch, unless `allow_lastname_mismatch`
/// 2. first name mismatch
/// 3. birth date mismatch
/// 4. fraudulent or blacklisted certificate
/// 5. valid certificate: accepted
/// 6. anything else: not valid
///
/// # Errors
/// Returns the `HealthPassError` of the first rule that rejects.
pub fn decide(
    outcome: &VerificationOutcome,
    ticket: &Ticket,
    allow_lastname_mismatch: bool,
) -> Result<(), HealthPassError> {
    let identity = &outcome.identity;

    let ticket_lastname = normalize_name(&ticket.lastname);
    let pass_lastname = normalize_name(&identity.last_name);
    if pass_lastname != ticket_lastname && !allow_lastname_mismatch {
        return Err(HealthPassError::LastnameNotMatching {
            expected: ticket_lastname,
            actual: pass_lastname,
        });
    }

    let ticket_firstname = normalize_name(&ticket.firstname);
    let pass_firstname = normalize_name(&identity.first_name);
    if pass_firstname != ticket_firstname {
        return Err(HealthPassError::FirstnameNotMatching {
            expected: ticket_firstname,
            actual: pass_firstname,
        });
    }

    if identity.date_of_birth != ticket.birthdate {
        return Err(HealthPassError::BirthdateNotMatching {
            expected: ticket.birthdate,
            actual: identity.date_of_birth,
        });
    }

    match identity.validity_status {
        ValidityStatus::Fraudulent => Err(HealthPassError::HealthPassBlacklisted),
        _ if outcome.is_blacklisted => Err(HealthPassError::HealthPassBlacklisted),
        ValidityStatus::Valid => Ok(()),
        ValidityStatus::Other => Err(HealthPassError::HealthPassNotValid),
    }
}
