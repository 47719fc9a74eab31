//! # Stripe Signature Scheme
//!
//! Parsing and computation of the `Stripe-Signature` header:
//! `t=<unix-timestamp>,v1=<hex-hmac>[,v1=<hex-hmac>...]`, where each `v1` is
//! the lowercase hex HMAC-SHA256 of `"{t}.{payload}"` keyed by the endpoint
//! secret. Several `v1` entries appear while a secret is being rolled.

use hmac::{Hmac, Mac};
use relay_core::VerificationError;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::{Choice, ConstantTimeEq};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature on inbound webhooks
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// The only signature scheme we accept
pub const SIGNATURE_SCHEME: &str = "v1";

/// Endpoint signing secret (`whsec_...`), used verbatim as the HMAC key
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(****)")
    }
}

impl From<&str> for WebhookSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret.as_bytes())
    }
}

impl From<String> for WebhookSecret {
    fn from(secret: String) -> Self {
        Self::new(secret.into_bytes())
    }
}

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a raw header value.
    ///
    /// Pairs without `=` and schemes other than `v1` (e.g. the `v0` test
    /// scheme) are skipped.
    pub fn parse(header: &str) -> Result<Self, VerificationError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    if timestamp.is_some() {
                        return Err(VerificationError::MalformedHeader(
                            "duplicate timestamp".to_string(),
                        ));
                    }
                    let parsed = value.trim().parse::<i64>().map_err(|_| {
                        VerificationError::MalformedHeader(format!(
                            "non-numeric timestamp: {:?}",
                            value.trim()
                        ))
                    })?;
                    timestamp = Some(parsed);
                }
                SIGNATURE_SCHEME => signatures.push(value.trim().to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            VerificationError::MalformedHeader("missing timestamp".to_string())
        })?;

        if signatures.is_empty() {
            return Err(VerificationError::MalformedHeader(
                "no v1 signature found".to_string(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }

    /// True if any signature equals `expected`.
    ///
    /// Every candidate is compared in full, in constant time.
    pub fn contains(&self, expected: &str) -> bool {
        let matched = self
            .signatures
            .iter()
            .fold(Choice::from(0), |acc, candidate| {
                acc | constant_time_eq(expected, candidate)
            });
        matched.into()
    }
}

impl FromStr for SignatureHeader {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.timestamp)?;
        for sig in &self.signatures {
            write!(f, ",{}={}", SIGNATURE_SCHEME, sig)?;
        }
        Ok(())
    }
}

/// Lowercase hex HMAC-SHA256 over `"{timestamp}.{payload}"`
pub fn compute_signature(secret: &WebhookSecret, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Build a header value signing `payload` at `timestamp`, as Stripe would
pub fn sign_payload(secret: &WebhookSecret, timestamp: i64, payload: &[u8]) -> String {
    SignatureHeader {
        timestamp,
        signatures: vec![compute_signature(secret, timestamp, payload)],
    }
    .to_string()
}

fn constant_time_eq(a: &str, b: &str) -> Choice {
    // unequal lengths yield 0 immediately; every real v1 is 64 chars
    a.as_bytes().ct_eq(b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signature_header() {
        let header = "t=1234567890,v1=abc123,v1=def456";
        let parsed = SignatureHeader::parse(header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], "abc123");
    }

    #[test]
    fn test_parse_skips_other_schemes() {
        let parsed = SignatureHeader::parse("t=42, v0=deadbeef, v1=cafe, junk").unwrap();
        assert_eq!(parsed.timestamp, 42);
        assert_eq!(parsed.signatures, vec!["cafe".to_string()]);
    }

    #[test]
    fn test_parse_malformed_headers() {
        for header in [
            "",
            "v1=abc123",
            "t=1234567890",
            "t=1234567890,v0=abc123",
            "t=soon,v1=abc123",
            "t=1,t=2,v1=abc123",
        ] {
            let err = SignatureHeader::parse(header).unwrap_err();
            assert!(
                matches!(err, VerificationError::MalformedHeader(_)),
                "{:?} gave {:?}",
                header,
                err
            );
        }
    }

    #[test]
    fn test_compute_signature_shape() {
        let sig = compute_signature(&"whsec_test".into(), 1234567890, b"{}");

        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_compute_signature_binds_every_input() {
        let secret: WebhookSecret = "whsec_test".into();
        let base = compute_signature(&secret, 100, b"{\"a\":1}");

        assert_eq!(base, compute_signature(&secret, 100, b"{\"a\":1}"));
        assert_ne!(base, compute_signature(&secret, 101, b"{\"a\":1}"));
        assert_ne!(base, compute_signature(&secret, 100, b"{\"a\":2}"));
        assert_ne!(base, compute_signature(&"whsec_other".into(), 100, b"{\"a\":1}"));
    }

    #[test]
    fn test_sign_payload_round_trips() {
        let secret: WebhookSecret = "whsec_test".into();
        let header = sign_payload(&secret, 1700000000, b"payload");
        let parsed: SignatureHeader = header.parse().unwrap();

        assert_eq!(parsed.timestamp, 1700000000);
        assert!(parsed.contains(&compute_signature(&secret, 1700000000, b"payload")));
    }

    #[test]
    fn test_contains() {
        let parsed = SignatureHeader::parse("t=1,v1=abc123,v1=def456").unwrap();
        assert!(parsed.contains("abc123"));
        assert!(parsed.contains("def456"));
        assert!(!parsed.contains("abc124"));
        assert!(!parsed.contains("abc"));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret: WebhookSecret = "whsec_supersecret".into();
        assert!(!format!("{:?}", secret).contains("supersecret"));
    }
}
