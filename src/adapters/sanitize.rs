//! Log sanitization for health pass material and secrets.
//!
//! Redacts, from any text that reaches the log sink:
//! - DCC payloads (`HC1:` prefixed base45 strings)
//! - 2D-Doc barcodes (`DC01`..`DC04` headers)
//! - Long base64 blobs (encrypted pass content, SPKI/PKCS#8 keys)
//! - JWTs and `key=value` style secrets
//! - PEM blocks
//! - E-mail addresses and labelled birth dates
//!
//! Sanitizing strings is a fallback. Request and key types already redact
//! themselves in `Debug`; this catches what slips through formatted messages.
//!
//! Input is capped (`HEALTHPASS_SANITIZE_MAX_BYTES`, default 16 KiB) since
//! regex scans over huge untrusted strings are costly.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    fast_set: RegexSet,
    rules: Vec<Rule>,
    pem: Rule,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEALTHPASS_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        // Order matters: specific formats before the generic base64 rule.
        let rules: Vec<(&'static str, &'static str)> = vec![
            (r"\bHC1:[0-9A-Z $%*+\-./:]{8,}", "[REDACTED-DCC]"),
            (r"\bDC0[1-4][0-9A-Z]{20,}[^\s]*", "[REDACTED-2DDOC]"),
            (
                r"\beyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\b",
                "[REDACTED-JWT]",
            ),
            (
                r#"(?i)\b(?:secret|password|private[_-]?key|public[_-]?key|key|token|pass[_-]?content)\b"?\s*[:=]\s*"?[A-Za-z0-9+/_-]{16,}={0,2}"?"#,
                "[REDACTED-SECRET]",
            ),
            (r"[A-Za-z0-9+/]{40,}={0,2}", "[REDACTED-BASE64]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r#"(?i)\b(?:birth_?date|date_?of_?birth|dob)\b"?\s*[:=]\s*"?\d{4}-\d{2}-\d{2}"?"#,
                "[REDACTED-BIRTHDATE]",
            ),
        ];

        let fast_set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        // Kept out of the set: bounded dot-all patterns inflate the compiled set.
        let pem = Rule {
            regex: Regex::new(
                r"(?s)-----BEGIN [A-Z0-9 ]{0,40}KEY-----[\s\S]{0,8192}?-----END [A-Z0-9 ]{0,40}KEY-----",
            )
            .expect("Valid regex"),
            replacement: "[REDACTED-PEM]",
        };

        Patterns {
            fast_set,
            rules,
            pem,
        }
    })
}

/// Sanitize a string by replacing sensitive patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();

    if prefix.contains("-----BEGIN ") {
        result = patterns
            .pem
            .regex
            .replace_all(&result, patterns.pem.replacement)
            .into_owned();
    }

    let matched: Vec<usize> = patterns.fast_set.matches(&result).into_iter().collect();
    for idx in matched {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains material that would be redacted.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let patterns = patterns();
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.fast_set.is_match(prefix)
        || (prefix.contains("-----BEGIN ") && patterns.pem.regex.is_match(prefix))
}

/// A `tracing_subscriber` writer that sanitizes each formatted line before
/// it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A single huge line without newline must not grow the buffer forever.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}
