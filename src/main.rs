//! healthpass: health pass submission tooling
//!
//! Commands:
//! - `encrypt`: encrypt a certificate for a ticket and print the submission JSON
//! - `decrypt`: recover the certificate from a submission (backend key holder only)
//! - `verify`: run the backend decision locally with the server secret key

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use healthpass::adapters::sanitize::SanitizingMakeWriter;
use healthpass::adapters::DecryptingVerifier;
use healthpass::application::{ValidationService, VerificationDispatcher};
use healthpass::config::{self, Config, LogMode};
use healthpass::domain::{decrypt_pass, encrypt_pass, TravelFile};
use healthpass::{HealthPassRequest, PassType, Ticket};

const USAGE: &str = "Usage:
  healthpass encrypt --ticket <ticket.json> --reference <ref> --type <dcc|2d-doc>
                     [--travel-date <rfc3339>] [--allow-lastname-mismatch] [--in <file>]
  healthpass decrypt --request <request.json> [--secret-key-file <path>]
  healthpass verify  --request <request.json> --ticket <ticket.json> --travel-date <rfc3339>
                     [--secret-key-file <path>] [--blacklist <file>]";

#[derive(Debug, Default)]
struct Args {
    ticket: Option<PathBuf>,
    request: Option<PathBuf>,
    input: Option<PathBuf>,
    secret_key_file: Option<PathBuf>,
    blacklist: Option<PathBuf>,
    reference: Option<String>,
    pass_type: Option<PassType>,
    travel_date: Option<DateTime<FixedOffset>>,
    allow_lastname_mismatch: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{name} requires a value\n{USAGE}"))
        };

        match arg.as_str() {
            "--ticket" => parsed.ticket = Some(PathBuf::from(value("--ticket")?)),
            "--request" => parsed.request = Some(PathBuf::from(value("--request")?)),
            "--in" => parsed.input = Some(PathBuf::from(value("--in")?)),
            "--secret-key-file" => {
                parsed.secret_key_file = Some(PathBuf::from(value("--secret-key-file")?));
            }
            "--blacklist" => parsed.blacklist = Some(PathBuf::from(value("--blacklist")?)),
            "--reference" => parsed.reference = Some(value("--reference")?),
            "--type" => {
                let raw = value("--type")?;
                parsed.pass_type = Some(raw.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--travel-date" => {
                let raw = value("--travel-date")?;
                parsed.travel_date = Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .with_context(|| format!("Invalid --travel-date {raw}"))?,
                );
            }
            "--allow-lastname-mismatch" => parsed.allow_lastname_mismatch = true,
            other => bail!("Unknown arg: {other}\n{USAGE}"),
        }
    }

    Ok(parsed)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {path:?}"))
}

fn load_secret_key(args: &Args) -> Result<healthpass::domain::ServerSecretKey> {
    let key = match &args.secret_key_file {
        Some(path) => config::load_server_secret_key(path)?,
        None => config::server_secret_key_from_env()?,
    };
    Ok(key)
}

fn run_encrypt(args: Args) -> Result<()> {
    let config = Config::from_env()?;
    let ticket: Ticket = read_json(args.ticket.as_deref().ok_or_else(|| anyhow!(USAGE))?)?;
    let pass_type = args.pass_type.ok_or_else(|| anyhow!(USAGE))?;
    let travel = TravelFile {
        reference: args.reference.ok_or_else(|| anyhow!(USAGE))?,
        travel_date: args
            .travel_date
            .unwrap_or_else(|| chrono::Utc::now().fixed_offset()),
    };

    let mut certificate = String::new();
    match &args.input {
        Some(path) => {
            certificate = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {path:?}"))?;
        }
        None => {
            std::io::stdin().read_to_string(&mut certificate)?;
        }
    }

    let encrypted = encrypt_pass(certificate.trim_end(), &config.server_public_key)?;
    let request = HealthPassRequest::assemble(
        &travel,
        &ticket,
        pass_type,
        encrypted,
        args.allow_lastname_mismatch,
    )
    .map_err(|errors| anyhow!("Invalid submission: {}", errors.join("; ")))?;

    tracing::info!(%pass_type, reference = %request.reference, "Prepared health pass submission");
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn run_decrypt(args: Args) -> Result<()> {
    let secret = load_secret_key(&args)?;
    let request: HealthPassRequest =
        read_json(args.request.as_deref().ok_or_else(|| anyhow!(USAGE))?)?;

    let plaintext = decrypt_pass(&request.pass_content, &request.public_key, &secret)?;
    println!("{}", plaintext.as_str());
    Ok(())
}

async fn run_verify(args: Args) -> Result<bool> {
    let secret = load_secret_key(&args)?;
    let request: HealthPassRequest =
        read_json(args.request.as_deref().ok_or_else(|| anyhow!(USAGE))?)?;
    let ticket: Ticket = read_json(args.ticket.as_deref().ok_or_else(|| anyhow!(USAGE))?)?;
    let travel_date = args.travel_date.ok_or_else(|| anyhow!(USAGE))?;

    let mut verifier = DecryptingVerifier::new(secret);
    if let Some(path) = &args.blacklist {
        let revoked: Vec<String> = read_json(path)?;
        for certificate in &revoked {
            verifier = verifier.with_blacklisted(certificate);
        }
    }
    let verifier = Arc::new(verifier);
    let service = ValidationService::new(VerificationDispatcher::new(verifier.clone(), verifier));

    let decision = service
        .validate_health_pass(&request, travel_date, &ticket)
        .await;
    match decision {
        Ok(()) => {
            println!("{}", serde_json::json!({ "code": "ACCEPTED" }));
            Ok(true)
        }
        Err(e) => {
            println!("{}", serde_json::to_string(&e)?);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output, so logs go to stderr unless configured.
    let (writer, _guard) = match config::log_mode_from_env()? {
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogMode::File(path) => {
            if let Some(parent) = path.parent() {
                // Best-effort: a missing directory surfaces as an open error below.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            tracing_appender::non_blocking(file)
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    if matches!(command.as_str(), "" | "-h" | "--help") {
        println!("{USAGE}");
        return Ok(());
    }
    let parsed = parse_args(args)?;

    let succeeded = match command.as_str() {
        "encrypt" => run_encrypt(parsed).map(|()| true),
        "decrypt" => run_decrypt(parsed).map(|()| true),
        "verify" => run_verify(parsed).await,
        other => Err(anyhow!("Unknown command: {other}\n{USAGE}")),
    }?;

    // Flush pending log lines before a non-zero exit skips destructors.
    drop(_guard);
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
