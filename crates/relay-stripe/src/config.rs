//! # Stripe Configuration
//!
//! Configuration management for the Stripe integration.
//! All secrets are loaded from environment variables once at startup and
//! never change afterwards.

use crate::signature::WebhookSecret;
use crate::webhook::{Tolerance, VerificationMode, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
use relay_core::{RelayError, RelayResult};
use std::fmt;

pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
pub const DEFAULT_API_VERSION: &str = "2024-12-18.acacia";

/// True for `ENVIRONMENT=production`, in any case
pub fn is_production_environment(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("production")
}

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_..., sk_live_... or restricted rk_...)
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version sent as `Stripe-Version`
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_API_KEY`
    ///
    /// Optional:
    /// - `STRIPE_API_BASE_URL`
    /// - `STRIPE_API_VERSION`
    pub fn from_env() -> RelayResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        let secret_key = lookup("STRIPE_SECRET_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                RelayError::Configuration("STRIPE_SECRET_API_KEY not set".to_string())
            })?;

        if !["sk_test_", "sk_live_", "rk_test_", "rk_live_"]
            .iter()
            .any(|prefix| secret_key.starts_with(prefix))
        {
            return Err(RelayError::Configuration(
                "STRIPE_SECRET_API_KEY must start with sk_test_, sk_live_, rk_test_ or rk_live_"
                    .to_string(),
            ));
        }

        let mut config = Self::new(secret_key);
        if let Some(url) = lookup("STRIPE_API_BASE_URL").filter(|v| !v.is_empty()) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(version) = lookup("STRIPE_API_VERSION").filter(|v| !v.is_empty()) {
            config.api_version = version;
        }
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.contains("_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.contains("_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Leading characters of the key, safe to log
    pub fn key_prefix(&self) -> &str {
        let end = self
            .secret_key
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.secret_key.len());
        &self.secret_key[..end]
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &format_args!("{}...", self.key_prefix()))
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Webhook verification configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub mode: VerificationMode,
    pub tolerance: Tolerance,
}

impl WebhookConfig {
    /// Load configuration from environment variables.
    ///
    /// - `WEBHOOK_VERIFICATION`: `enforced` (default) or `bypassed`
    /// - `STRIPE_WEBHOOK_SECRET`: required when enforced
    /// - `WEBHOOK_TOLERANCE_SECS`: replay window, default 300, `0` disables
    /// - `ENVIRONMENT`: bypass is refused in `production`
    pub fn from_env() -> RelayResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        let tolerance = match lookup("WEBHOOK_TOLERANCE_SECS").filter(|v| !v.is_empty()) {
            Some(raw) => Tolerance::from_secs(raw.trim().parse().map_err(|_| {
                RelayError::Configuration(format!(
                    "WEBHOOK_TOLERANCE_SECS must be a whole number of seconds, got {:?}",
                    raw
                ))
            })?),
            None => Tolerance::Seconds(DEFAULT_TOLERANCE_SECS),
        };

        let requested = lookup("WEBHOOK_VERIFICATION")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "enforced".to_string());

        let mode = match requested.as_str() {
            "enforced" => {
                let secret = lookup("STRIPE_WEBHOOK_SECRET")
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        RelayError::Configuration(
                            "STRIPE_WEBHOOK_SECRET not set (set WEBHOOK_VERIFICATION=bypassed to accept unsigned webhooks in development)"
                                .to_string(),
                        )
                    })?;
                VerificationMode::Enforced(WebhookSecret::from(secret))
            }
            "bypassed" => {
                let environment = lookup("ENVIRONMENT").unwrap_or_default();
                if is_production_environment(&environment) {
                    return Err(RelayError::Configuration(
                        "WEBHOOK_VERIFICATION=bypassed is not allowed in production".to_string(),
                    ));
                }
                VerificationMode::Bypassed
            }
            other => {
                return Err(RelayError::Configuration(format!(
                    "WEBHOOK_VERIFICATION must be enforced or bypassed, got {:?}",
                    other
                )))
            }
        };

        Ok(Self { mode, tolerance })
    }

    /// Build the verifier this configuration describes
    pub fn verifier(&self) -> WebhookVerifier {
        WebhookVerifier::new(self.mode.clone(), self.tolerance)
    }
}
