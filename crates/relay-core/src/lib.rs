//! # relay-core
//!
//! Core types and traits for stripe-relay.
//!
//! This crate provides:
//! - `PaymentGateway` trait over the provider's REST API
//! - Request parameters and response objects for checkout sessions,
//!   payment intents, charges and accounts
//! - `RelayError` and `VerificationError` for typed error handling

pub mod error;
pub mod gateway;
pub mod resources;

// Re-exports for convenience
pub use error::{RelayError, RelayResult, VerificationError};
pub use gateway::{BoxedPaymentGateway, PaymentGateway};
pub use resources::{
    Account, Charge, CheckoutLineItem, CheckoutSession, CreateCheckoutSession, CustomerDetails,
    PaymentIntent, PriceData, UpdateCheckoutSession, DEFAULT_CHECKOUT_MODE, DEFAULT_UI_MODE,
};
