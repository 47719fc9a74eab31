//! # relay-stripe
//!
//! Stripe integration for stripe-relay.
//!
//! This crate provides:
//!
//! 1. **StripeGateway** - `PaymentGateway` over the Stripe REST API
//!    - Checkout sessions (create, retrieve, update)
//!    - Payment intents, charges, account
//!
//! 2. **Webhook pipeline** - authenticate and route inbound events
//!    - `Stripe-Signature` parsing and HMAC-SHA256 verification
//!    - Replay window on the signed timestamp
//!    - Type-tag dispatch with a mandatory fallback
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use relay_stripe::{EventDispatcher, WebhookPipeline, WebhookVerifier, Disposition};
//!
//! let pipeline = WebhookPipeline::new(
//!     WebhookVerifier::enforced("whsec_..."),
//!     EventDispatcher::default().with_handler("invoice.paid", Arc::new(MyInvoiceHandler)),
//! );
//!
//! // In your webhook endpoint:
//! match pipeline.process(&body, signature, Utc::now()) {
//!     Disposition::Acknowledged(_) => StatusCode::OK,
//!     Disposition::Rejected(_) => StatusCode::BAD_REQUEST,
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod signature;
pub mod webhook;

// Re-exports
pub use client::StripeGateway;
pub use config::{is_production_environment, StripeConfig, WebhookConfig};
pub use dispatch::{
    BoxedEventHandler, DispatchOutcome, EventDispatcher, EventHandler, CHARGE_SUCCEEDED,
    CHECKOUT_SESSION_COMPLETED, PAYMENT_INTENT_SUCCEEDED,
};
pub use pipeline::{Disposition, WebhookPipeline};
pub use signature::{sign_payload, SignatureHeader, WebhookSecret, SIGNATURE_HEADER};
pub use webhook::{verify, Provenance, Tolerance, VerificationMode, VerifiedEvent, WebhookVerifier};
