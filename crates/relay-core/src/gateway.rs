//! # Payment Gateway Trait
//!
//! Client-side abstraction over the payment provider's REST API.
//! The HTTP handlers only ever talk to a `PaymentGateway`, so the provider
//! can be swapped for a fake in tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── create_checkout_session() / update_checkout_session()  │
//! │  ├── get_checkout_session()                                 │
//! │  ├── get_payment_intent() / get_charge()                    │
//! │  └── get_account()                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ StripeGateway │
//!                    └───────────────┘
//! ```

use crate::error::RelayResult;
use crate::resources::{
    Account, Charge, CheckoutSession, CreateCheckoutSession, PaymentIntent,
    UpdateCheckoutSession,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the relay forwards to the payment provider.
///
/// Implementations hold their own credentials; nothing here takes a key.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout session.
    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> RelayResult<CheckoutSession>;

    /// Retrieve a checkout session by id.
    async fn get_checkout_session(&self, id: &str) -> RelayResult<CheckoutSession>;

    /// Update a checkout session by id.
    async fn update_checkout_session(
        &self,
        id: &str,
        params: &UpdateCheckoutSession,
    ) -> RelayResult<CheckoutSession>;

    /// Retrieve a payment intent by id.
    async fn get_payment_intent(&self, id: &str) -> RelayResult<PaymentIntent>;

    /// Retrieve a charge by id.
    async fn get_charge(&self, id: &str) -> RelayResult<Charge>;

    /// Retrieve the account the credentials belong to.
    async fn get_account(&self) -> RelayResult<Account>;

    /// Provider name (for logging and error bodies).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
