//! # Application State
//!
//! Shared state for the Axum application.
//! Built once at startup and never mutated: the gateway owns the API key,
//! the webhook pipeline owns the signing secret.

use relay_core::{BoxedPaymentGateway, RelayError};
use relay_stripe::{
    is_production_environment, EventDispatcher, StripeConfig, StripeGateway, WebhookConfig,
    WebhookPipeline,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Price used when a checkout request carries no line items
    pub default_price_id: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let port = match lookup("PORT").filter(|p| !p.is_empty()) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                RelayError::Configuration(format!("PORT must be a port number, got {:?}", raw))
            })?,
            None => 8080,
        };

        Ok(Self {
            host: lookup("HOST")
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            environment: lookup("ENVIRONMENT")
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "development".to_string()),
            default_price_id: lookup("STRIPE_DEFAULT_PRICE_ID").filter(|p| !p.is_empty()),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, RelayError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            RelayError::Configuration(format!(
                "Invalid socket address {}:{}",
                self.host, self.port
            ))
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        is_production_environment(&self.environment)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider client
    pub gateway: BoxedPaymentGateway,
    /// Webhook verifier + dispatcher
    pub webhooks: Arc<WebhookPipeline>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Assemble state from already-built parts
    pub fn new(config: AppConfig, gateway: BoxedPaymentGateway, webhooks: WebhookPipeline) -> Self {
        Self {
            gateway,
            webhooks: Arc::new(webhooks),
            config,
        }
    }

    /// Build state from the environment. Any missing required value is an
    /// error here, before the server binds.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let stripe_config = StripeConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        info!(
            "Stripe key loaded (starts with): {}... ({})",
            stripe_config.key_prefix(),
            if stripe_config.is_live_mode() { "live" } else { "test" }
        );

        let webhook_config = WebhookConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to configure webhooks: {}", e))?;
        if webhook_config.mode.is_bypassed() {
            warn!("Webhook signature verification is BYPASSED; unsigned webhooks will be accepted");
        }
        info!(
            "Webhook verification: mode={}, tolerance={}",
            webhook_config.mode.name(),
            webhook_config.tolerance
        );

        let gateway = StripeGateway::new(stripe_config)?;
        let pipeline = WebhookPipeline::new(webhook_config.verifier(), EventDispatcher::default());

        Ok(Self::new(config, Arc::new(gateway), pipeline))
    }
}
