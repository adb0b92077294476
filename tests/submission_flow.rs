//! End-to-end flow: client encryption → backend dispatch → identity decision.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};

use healthpass::adapters::DecryptingVerifier;
use healthpass::application::{
    SubmissionContext, SubmissionService, ValidationService, VerificationDispatcher,
};
use healthpass::domain::{ServerPublicKey, ServerSecretKey, TravelFile};
use healthpass::ports::HealthPassGateway;
use healthpass::{Error, HealthPassError, HealthPassRequest, PassType, Ticket};

/// Gateway delivering requests straight to an in-process backend.
struct InProcessBackend {
    service: ValidationService,
    ticket: Ticket,
    travel_date: DateTime<FixedOffset>,
}

#[async_trait]
impl HealthPassGateway for InProcessBackend {
    async fn submit(&self, request: &HealthPassRequest) -> Result<(), HealthPassError> {
        // Requests travel as JSON.
        let wire = serde_json::to_string(request).map_err(|_| HealthPassError::UnexpectedError)?;
        let received: HealthPassRequest =
            serde_json::from_str(&wire).map_err(|_| HealthPassError::UnexpectedError)?;

        self.service
            .validate_health_pass(&received, self.travel_date, &self.ticket)
            .await
    }
}

fn travel_date() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2021-09-01T08:00:00+02:00").expect("Should parse")
}

fn ticket() -> Ticket {
    Ticket {
        id: "T-42".to_string(),
        lastname: "Dupont".to_string(),
        firstname: "Marie".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1990, 5, 1).expect("Valid date"),
    }
}

fn context(pass_type: PassType) -> SubmissionContext {
    SubmissionContext {
        travel: TravelFile {
            reference: "ABC123".to_string(),
            travel_date: travel_date(),
        },
        ticket: ticket(),
        pass_type,
        allow_lastname_mismatch: false,
    }
}

fn certificate(last_name: &str, first_name: &str, status: &str) -> String {
    serde_json::json!({
        "lastName": last_name,
        "firstName": first_name,
        "dateOfBirth": "1990-05-01",
        "validityStatus": status,
    })
    .to_string()
}

fn client(
    verifier: DecryptingVerifier,
    public: ServerPublicKey,
) -> SubmissionService<InProcessBackend> {
    let verifier = Arc::new(verifier);
    let backend = InProcessBackend {
        service: ValidationService::new(VerificationDispatcher::new(verifier.clone(), verifier)),
        ticket: ticket(),
        travel_date: travel_date(),
    };
    SubmissionService::new(public, Arc::new(backend))
}

#[tokio::test]
async fn test_matching_certificate_is_accepted() {
    let secret = ServerSecretKey::generate();
    let public = secret.public_key().expect("Should derive public key");
    let client = client(DecryptingVerifier::new(secret), public);

    for pass_type in [PassType::Dcc, PassType::Other2dDoc] {
        client
            .submit(&certificate("Dupont", "Marie", "VALID"), &context(pass_type))
            .await
            .expect("Should be accepted");
    }
}

#[tokio::test]
async fn test_accented_certificate_is_accepted() {
    let secret = ServerSecretKey::generate();
    let public = secret.public_key().expect("Should derive public key");
    let client = client(DecryptingVerifier::new(secret), public);

    client
        .submit(&certificate("DUPONT ", "Marié", "VALID"), &context(PassType::Dcc))
        .await
        .expect("Should be accepted");
}

#[tokio::test]
async fn test_firstname_mismatch_is_reported() {
    let secret = ServerSecretKey::generate();
    let public = secret.public_key().expect("Should derive public key");
    let client = client(DecryptingVerifier::new(secret), public);

    let result = client
        .submit(&certificate("Dupont", "Marion", "VALID"), &context(PassType::Dcc))
        .await;

    match result {
        Err(Error::Rejected(HealthPassError::FirstnameNotMatching {
            expected,
            actual,
        })) => {
            assert_eq!(expected, "MARIE");
            assert_eq!(actual, "MARION");
        }
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_blacklisted_certificate_is_rejected() {
    let secret = ServerSecretKey::generate();
    let public = secret.public_key().expect("Should derive public key");
    let document = certificate("Dupont", "Marie", "VALID");
    let client = client(DecryptingVerifier::new(secret).with_blacklisted(&document), public);

    let result = client.submit(&document, &context(PassType::Dcc)).await;
    assert!(matches!(
        result,
        Err(Error::Rejected(HealthPassError::HealthPassBlacklisted))
    ));
}

#[tokio::test]
async fn test_wrong_server_key_is_malformed() {
    let secret = ServerSecretKey::generate();
    // Client configured with a stale key the backend cannot decrypt for.
    let stale = ServerSecretKey::generate()
        .public_key()
        .expect("Should derive public key");
    let client = client(DecryptingVerifier::new(secret), stale);

    let result = client
        .submit(&certificate("Dupont", "Marie", "VALID"), &context(PassType::Other2dDoc))
        .await;
    assert!(matches!(
        result,
        Err(Error::Rejected(HealthPassError::CertificateMalformed))
    ));
}

#[tokio::test]
async fn test_expired_certificate_is_not_valid() {
    let secret = ServerSecretKey::generate();
    let public = secret.public_key().expect("Should derive public key");
    let client = client(DecryptingVerifier::new(secret), public);

    let result = client
        .submit(&certificate("Dupont", "Marie", "EXPIRED"), &context(PassType::Dcc))
        .await;
    assert!(matches!(
        result,
        Err(Error::Rejected(HealthPassError::HealthPassNotValid))
    ));
}
