//! # relay-api
//!
//! HTTP API layer for stripe-relay.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Proxy endpoints for checkout sessions, payment intents, charges and the account
//! - The Stripe webhook endpoint (verify, then dispatch)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/checkout/session` | Create checkout session |
//! | GET | `/checkout/session/{id}` | Session summary |
//! | PATCH | `/checkout/session/{id}` | Update checkout session |
//! | GET | `/payment_intents/{id}` | Payment intent |
//! | GET | `/charges/{id}` | Charge |
//! | GET | `/account` | Account |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
