//! P-256 server keypair generation for the health pass verification backend.
//!
//! Generates the long-lived key clients encrypt passes for:
//! - Secret key (base64 PKCS#8 DER) written with 0600 permissions
//! - Public key (base64 SPKI DER) optionally written separately; this is the
//!   value to configure as `HEALTHPASS_SERVER_PUBLIC_KEY` on clients
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_server_key -- --out-secret <path> [--out-pub <path>] [--force]
//! ```

use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use healthpass::domain::ServerSecretKey;

const USAGE: &str = "Usage: generate_server_key --out-secret <path> [--out-pub <path>] [--force]";

fn fail(code: i32, message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(code);
}

fn write_file(path: &Path, content: &str, mode: u32) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(path)?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")
}

fn main() {
    let mut args = std::env::args().skip(1);
    let mut out_secret_path: Option<PathBuf> = None;
    let mut out_pub_path: Option<PathBuf> = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out-secret" => match args.next().filter(|p| !p.is_empty()) {
                Some(p) => out_secret_path = Some(PathBuf::from(p)),
                None => fail(2, USAGE),
            },
            "--out-pub" => match args.next().filter(|p| !p.is_empty()) {
                Some(p) => out_pub_path = Some(PathBuf::from(p)),
                None => fail(2, USAGE),
            },
            "--force" => force = true,
            "-h" | "--help" => {
                println!(
                    "{USAGE}\n\nWrites the base64 PKCS#8 server secret key to <path> with 0600 permissions. Optionally writes the base64 SPKI public key to --out-pub. Prints only non-secret material."
                );
                return;
            }
            _ => fail(2, &format!("Unknown arg: {arg}\n{USAGE}")),
        }
    }

    let out_secret_path = out_secret_path.unwrap_or_else(|| fail(2, USAGE));

    for path in std::iter::once(&out_secret_path).chain(out_pub_path.as_ref()) {
        if path.exists() && !force {
            fail(
                3,
                &format!("Refusing to overwrite existing file {path:?}. Use --force."),
            );
        }
    }

    let secret = ServerSecretKey::generate();
    let secret_b64 = secret
        .to_base64_pkcs8()
        .unwrap_or_else(|e| fail(4, &format!("Failed to encode secret key: {e}")));
    let pub_b64 = secret
        .public_key()
        .and_then(|public| public.to_base64_spki())
        .unwrap_or_else(|e| fail(4, &format!("Failed to encode public key: {e}")));

    if let Err(e) = write_file(&out_secret_path, &secret_b64, 0o600) {
        fail(4, &format!("Failed to write {out_secret_path:?}: {e}"));
    }

    if let Some(pub_path) = &out_pub_path {
        // Public key is non-secret; allow read access.
        if let Err(e) = write_file(pub_path, &pub_b64, 0o644) {
            fail(4, &format!("Failed to write {pub_path:?}: {e}"));
        }
    }

    // Print only non-secret material.
    println!("Wrote server secret key (base64 PKCS#8) to {out_secret_path:?}");
    if let Some(pub_path) = &out_pub_path {
        println!("Wrote server public key (base64 SPKI) to {pub_path:?}");
    }
    println!("HEALTHPASS_SERVER_PUBLIC_KEY={pub_b64}");
    println!("fingerprint={}", secret.fingerprint);
}
