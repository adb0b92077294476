//! Environment-driven configuration.
//!
//! Supported:
//! - `HEALTHPASS_SERVER_PUBLIC_KEY`: base64 SPKI of the server P-256 key
//! - `HEALTHPASS_SERVER_PUBLIC_KEY_FILE`: file holding the same value
//! - `HEALTHPASS_SERVER_SECRET_KEY_FILE`: base64 PKCS#8 server key (backend only)
//! - `HEALTHPASS_LOG_MODE`: `stdout`, `file` or `auto`
//! - `HEALTHPASS_LOG_FILE`: log path when logging to a file
//!
//! The inline public key takes precedence over the file.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::domain::{CryptoError, ServerPublicKey, ServerSecretKey};

pub const SERVER_PUBLIC_KEY_ENV: &str = "HEALTHPASS_SERVER_PUBLIC_KEY";
pub const SERVER_PUBLIC_KEY_FILE_ENV: &str = "HEALTHPASS_SERVER_PUBLIC_KEY_FILE";
pub const SERVER_SECRET_KEY_FILE_ENV: &str = "HEALTHPASS_SERVER_SECRET_KEY_FILE";
pub const LOG_MODE_ENV: &str = "HEALTHPASS_LOG_MODE";
pub const LOG_FILE_ENV: &str = "HEALTHPASS_LOG_FILE";

const DEFAULT_LOG_FILE: &str = "healthpass.log";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing server public key: set {SERVER_PUBLIC_KEY_ENV} or {SERVER_PUBLIC_KEY_FILE_ENV}")]
    MissingServerKey,

    #[error("Missing server secret key: set {SERVER_SECRET_KEY_FILE_ENV}")]
    MissingSecretKey,

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid key in configuration: {0}")]
    InvalidKey(#[from] CryptoError),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File(PathBuf),
    /// Standard error, keeping stdout free for command output
    Stderr,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_public_key: ServerPublicKey,
    pub log_mode: LogMode,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if the server key is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` if the server key is missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = match non_empty(lookup(SERVER_PUBLIC_KEY_ENV)) {
            Some(value) => value,
            None => {
                let path = non_empty(lookup(SERVER_PUBLIC_KEY_FILE_ENV))
                    .ok_or(ConfigError::MissingServerKey)?;
                read_trimmed(Path::new(&path))?.to_string()
            }
        };
        let server_public_key = ServerPublicKey::from_base64_spki(&encoded)?;

        let log_mode = log_mode_from_lookup(&lookup)?;

        tracing::debug!(server_key = %server_public_key.fingerprint, "Loaded configuration");

        Ok(Self {
            server_public_key,
            log_mode,
        })
    }
}

/// Resolve the log destination from the environment.
///
/// # Errors
/// Returns `ConfigError::InvalidValue` for an unknown mode.
pub fn log_mode_from_env() -> Result<LogMode, ConfigError> {
    log_mode_from_lookup(|name| std::env::var(name).ok())
}

fn log_mode_from_lookup<F>(lookup: F) -> Result<LogMode, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = || {
        PathBuf::from(
            non_empty(lookup(LOG_FILE_ENV)).unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        )
    };

    match non_empty(lookup(LOG_MODE_ENV)).as_deref() {
        None | Some("auto") => Ok(LogMode::Stderr),
        Some("stdout") => Ok(LogMode::Stdout),
        Some("file") => Ok(LogMode::File(file())),
        Some(other) => Err(ConfigError::InvalidValue {
            name: LOG_MODE_ENV,
            value: other.to_string(),
        }),
    }
}

/// Load the server secret key named by `HEALTHPASS_SERVER_SECRET_KEY_FILE`.
///
/// # Errors
/// Returns `ConfigError` if the variable is unset or the key is invalid.
pub fn server_secret_key_from_env() -> Result<ServerSecretKey, ConfigError> {
    let path = non_empty(std::env::var(SERVER_SECRET_KEY_FILE_ENV).ok())
        .ok_or(ConfigError::MissingSecretKey)?;
    load_server_secret_key(Path::new(&path))
}

/// Load a base64 PKCS#8 server secret key from `path`.
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read or holds an invalid key.
pub fn load_server_secret_key(path: &Path) -> Result<ServerSecretKey, ConfigError> {
    let encoded = read_trimmed(path)?;
    Ok(ServerSecretKey::from_base64_pkcs8(&encoded)?)
}

fn read_trimmed(path: &Path) -> Result<Zeroizing<String>, ConfigError> {
    let content = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
        ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?);
    Ok(Zeroizing::new(content.trim().to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn encoded_public_key() -> (ServerSecretKey, String) {
        let secret = ServerSecretKey::generate();
        let encoded = secret
            .public_key()
            .expect("Should derive public key")
            .to_base64_spki()
            .expect("Should export");
        (secret, encoded)
    }

    #[test]
    fn test_inline_public_key() {
        let (secret, encoded) = encoded_public_key();
        let config = Config::from_lookup(lookup(&[(SERVER_PUBLIC_KEY_ENV, encoded)]))
            .expect("Should load");

        assert_eq!(config.server_public_key.fingerprint, secret.fingerprint);
        assert_eq!(config.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_public_key_from_file() {
        let (secret, encoded) = encoded_public_key();
        let path = std::env::temp_dir().join(format!("healthpass-pub-{}.b64", secret.fingerprint));
        std::fs::write(&path, format!("{encoded}\n")).expect("Should write key file");

        let config = Config::from_lookup(lookup(&[(
            SERVER_PUBLIC_KEY_FILE_ENV,
            path.display().to_string(),
        )]))
        .expect("Should load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.server_public_key.fingerprint, secret.fingerprint);
    }

    #[test]
    fn test_missing_public_key() {
        let result = Config::from_lookup(lookup(&[(SERVER_PUBLIC_KEY_ENV, "  ".to_string())]));
        assert!(matches!(result, Err(ConfigError::MissingServerKey)));
    }

    #[test]
    fn test_invalid_public_key() {
        let result = Config::from_lookup(lookup(&[(SERVER_PUBLIC_KEY_ENV, "AAAA".to_string())]));
        assert!(matches!(result, Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn test_log_modes() {
        let mode = log_mode_from_lookup(lookup(&[(LOG_MODE_ENV, "file".to_string())]))
            .expect("Should parse");
        assert_eq!(mode, LogMode::File(PathBuf::from(DEFAULT_LOG_FILE)));

        let mode = log_mode_from_lookup(lookup(&[(LOG_MODE_ENV, "stdout".to_string())]))
            .expect("Should parse");
        assert_eq!(mode, LogMode::Stdout);

        let result = log_mode_from_lookup(lookup(&[(LOG_MODE_ENV, "syslog".to_string())]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_secret_key_file() {
        let secret = ServerSecretKey::generate();
        let path = std::env::temp_dir().join(format!("healthpass-sec-{}.b64", secret.fingerprint));
        std::fs::write(&path, secret.to_base64_pkcs8().expect("Should export").as_bytes())
            .expect("Should write key file");

        let loaded = load_server_secret_key(&path).expect("Should load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.fingerprint, secret.fingerprint);
    }
}
