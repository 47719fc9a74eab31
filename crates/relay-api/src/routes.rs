//! # Routes
//!
//! Axum router configuration for the relay.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Proxy (browser-facing, CORS enabled):
///   - POST  /checkout/session - Create checkout session
///   - GET   /checkout/session/{id} - Session summary
///   - PATCH /checkout/session/{id} - Update session
///   - GET   /payment_intents/{id} - Payment intent
///   - GET   /charges/{id} - Charge
///   - GET   /account - Account
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let proxy_routes = Router::new()
        .route("/checkout/session", post(handlers::create_checkout_session))
        .route(
            "/checkout/session/{id}",
            get(handlers::get_checkout_session).patch(handlers::update_checkout_session),
        )
        .route("/payment_intents/{id}", get(handlers::get_payment_intent))
        .route("/charges/{id}", get(handlers::get_charge))
        .route("/account", get(handlers::get_account))
        .layer(cors);

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .merge(proxy_routes)
        .nest("/webhook", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
