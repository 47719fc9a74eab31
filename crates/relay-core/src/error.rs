//! # Relay Error Types
//!
//! Typed error handling for stripe-relay.
//! Gateway operations return `Result<T, RelayError>`; webhook verification
//! returns `Result<T, VerificationError>`.

use thiserror::Error;

/// Reasons an inbound webhook is rejected before dispatch.
///
/// Every variant maps to `400 Bad Request`. The sender only ever sees
/// accept/reject, never which check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Signature header missing, without `t=`, without `v1=`, or with a
    /// non-numeric timestamp
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No `v1` signature matched the computed HMAC
    #[error("No signature matches the expected signature for the payload")]
    SignatureMismatch,

    /// Signed timestamp outside the replay window
    #[error("Timestamp outside tolerance: skew of {skew_secs}s exceeds {tolerance_secs}s")]
    TimestampStale { skew_secs: i64, tolerance_secs: u64 },

    /// Body authenticated but is not an event envelope
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl VerificationError {
    /// Short machine-readable tag, used in logs and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::MalformedHeader(_) => "malformed_header",
            VerificationError::SignatureMismatch => "signature_mismatch",
            VerificationError::TimestampStale { .. } => "timestamp_stale",
            VerificationError::MalformedPayload(_) => "malformed_payload",
        }
    }
}

/// Core error type for gateway and configuration operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data from our own client
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment provider answered with a non-success status
    #[error("Provider error [{provider}] (HTTP {status}): {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Webhook verification failed
    #[error("Webhook verification failed: {0}")]
    Verification(#[from] VerificationError),
}

impl RelayError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::NetworkError(_) => true,
            RelayError::ProviderError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    ///
    /// Provider 4xx answers surface as `400`, provider 5xx as `502`.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Configuration(_) => 500,
            RelayError::InvalidRequest(_) => 400,
            RelayError::ProviderError { status, .. } if *status >= 500 => 502,
            RelayError::ProviderError { .. } => 400,
            RelayError::NetworkError(_) => 503,
            RelayError::Serialization(_) => 500,
            RelayError::Verification(_) => 400,
        }
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
