//! # Request Handlers
//!
//! Axum request handlers. The proxy endpoints translate JSON requests into
//! gateway calls; the webhook endpoint feeds the raw body through the
//! verification pipeline.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use relay_core::{
    Account, Charge, CheckoutLineItem, CreateCheckoutSession, PaymentIntent, PriceData,
    RelayError, UpdateCheckoutSession, DEFAULT_CHECKOUT_MODE, DEFAULT_UI_MODE,
};
use relay_stripe::{Disposition, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout session request
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Items to purchase
    #[serde(default)]
    pub line_items: Vec<CheckoutLineItem>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    /// Embedded UI mode only
    #[serde(default)]
    pub return_url: Option<String>,
    /// `payment`, `subscription` or `setup` (default `payment`)
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// `hosted` or `embedded` (default `hosted`)
    #[serde(default)]
    pub ui_mode: Option<String>,
    /// Inline single item, used when `line_items` is empty
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub unit_amount: Option<i64>,
}

/// Create checkout session response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: String,
    pub url: String,
}

/// Session summary returned by the GET endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
}

/// Update checkout session request
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionRequest {
    /// Replace line items with one unit of this price
    #[serde(default)]
    pub new_price: Option<String>,
    /// Accepted and logged; not forwarded
    #[serde(default)]
    pub shipping_address: Option<serde_json::Value>,
    /// Accepted and logged; not forwarded
    #[serde(default)]
    pub transfer_data: Option<serde_json::Value>,
}

/// Update checkout session response
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSessionResponse {
    pub id: String,
    pub updated: bool,
}

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Set when the same request may succeed later
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn relay_error_to_response(err: RelayError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    response.retryable = err.is_retryable();
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400)),
    )
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        let details = rejection.body_text();
        warn!("Rejected request body: {}", details);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid request body", 400).with_details(details)),
        )
    })
}

/// Provider ids are opaque tokens like `cs_test_a1B2`; anything else would
/// be spliced into the upstream URL path.
fn validate_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(bad_request(format!("invalid id: {:?}", id)));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CreateSessionRequest {
    /// Turn the request into gateway parameters, filling defaults
    fn into_params(self, default_price_id: Option<&str>) -> Result<CreateCheckoutSession, ApiError> {
        let line_items = if !self.line_items.is_empty() {
            self.line_items
        } else if let (Some(currency), Some(product_name), Some(unit_amount)) = (
            non_empty(self.currency),
            non_empty(self.product_name),
            self.unit_amount,
        ) {
            vec![CheckoutLineItem::inline(
                PriceData {
                    currency,
                    unit_amount,
                    product_name,
                },
                1,
            )]
        } else if let Some(price) = default_price_id {
            vec![CheckoutLineItem::price(price, 1)]
        } else {
            return Err(bad_request(
                "No line items (provide 'line_items', or 'currency' + 'product_name' + 'unit_amount')",
            ));
        };

        let mut params = CreateCheckoutSession::new(line_items);
        params.mode = non_empty(self.mode).unwrap_or_else(|| DEFAULT_CHECKOUT_MODE.to_string());
        params.ui_mode = non_empty(self.ui_mode).unwrap_or_else(|| DEFAULT_UI_MODE.to_string());
        params.success_url = non_empty(self.success_url);
        params.cancel_url = non_empty(self.cancel_url);
        params.return_url = non_empty(self.return_url);
        params.customer_email = non_empty(self.customer_email);
        Ok(params)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "stripe-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a checkout session
#[instrument(skip(state, body))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let request = json_body(body)?;
    let params = request.into_params(state.config.default_price_id.as_deref())?;

    info!(
        "Creating checkout session (mode={}, ui_mode={})",
        params.mode, params.ui_mode
    );

    let session = state
        .gateway
        .create_checkout_session(&params)
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            relay_error_to_response(e)
        })?;

    info!(
        "Created checkout session: {} (url: {})",
        session.id,
        session.url.as_deref().unwrap_or("")
    );

    Ok(Json(CreateSessionResponse {
        id: session.id,
        url: session.url.unwrap_or_default(),
    }))
}

/// Retrieve a checkout session
#[instrument(skip(state))]
pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    validate_id(&id)?;

    let session = state.gateway.get_checkout_session(&id).await.map_err(|e| {
        error!("Failed to fetch checkout session {}: {}", id, e);
        relay_error_to_response(e)
    })?;

    info!(
        "Fetched checkout session: {} (status: {}, amount: {})",
        session.id,
        session.status.as_deref().unwrap_or("unknown"),
        session.amount_total.unwrap_or_default()
    );

    Ok(Json(SessionSummary {
        id: session.id,
        status: session.status,
        amount: session.amount_total,
    }))
}

/// Update a checkout session
#[instrument(skip(state, body))]
pub async fn update_checkout_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSessionRequest>, JsonRejection>,
) -> Result<Json<UpdateSessionResponse>, ApiError> {
    validate_id(&id)?;
    let request = json_body(body)?;

    let params = UpdateCheckoutSession {
        line_items: non_empty(request.new_price.clone())
            .map(|price| vec![CheckoutLineItem::price(price, 1)])
            .unwrap_or_default(),
    };

    info!(
        "Updating checkout session {}: new_price={:?}, shipping_address={:?}, transfer_data={:?}",
        id, request.new_price, request.shipping_address, request.transfer_data
    );

    let session = state
        .gateway
        .update_checkout_session(&id, &params)
        .await
        .map_err(|e| {
            error!("Failed to update checkout session {}: {}", id, e);
            relay_error_to_response(e)
        })?;

    info!("Updated checkout session: {}", session.id);

    Ok(Json(UpdateSessionResponse {
        id: session.id,
        updated: true,
    }))
}

/// Retrieve a payment intent
#[instrument(skip(state))]
pub async fn get_payment_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentIntent>, ApiError> {
    validate_id(&id)?;

    let intent = state.gateway.get_payment_intent(&id).await.map_err(|e| {
        error!("Failed to fetch payment intent {}: {}", id, e);
        relay_error_to_response(e)
    })?;

    info!(
        "PaymentIntent: {} (status: {}, amount: {})",
        intent.id,
        intent.status.as_deref().unwrap_or("unknown"),
        intent.amount
    );
    Ok(Json(intent))
}

/// Retrieve a charge
#[instrument(skip(state))]
pub async fn get_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Charge>, ApiError> {
    validate_id(&id)?;

    let charge = state.gateway.get_charge(&id).await.map_err(|e| {
        error!("Failed to fetch charge {}: {}", id, e);
        relay_error_to_response(e)
    })?;

    info!(
        "Charge: {} (amount: {}, paid: {})",
        charge.id, charge.amount, charge.paid
    );
    Ok(Json(charge))
}

/// Retrieve the account
#[instrument(skip(state))]
pub async fn get_account(State(state): State<AppState>) -> Result<Json<Account>, ApiError> {
    let account = state.gateway.get_account().await.map_err(|e| {
        error!("Failed to fetch account: {}", e);
        relay_error_to_response(e)
    })?;

    info!("Account: {}", account.id);
    Ok(Json(account))
}

/// Handle Stripe webhook
///
/// The body is taken as raw bytes: the signature covers the exact bytes
/// Stripe sent.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.webhooks.process(&body, signature, Utc::now()) {
        Disposition::Acknowledged(outcome) => {
            info!(
                "Webhook acknowledged: type={}, outcome={}",
                outcome.event_type(),
                outcome.label()
            );
            Ok(Json(WebhookAck { received: true }))
        }
        // already logged with its reason by the pipeline
        Disposition::Rejected(_) => Err(bad_request("webhook verification failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("why");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("why"));
    }

    #[test]
    fn test_relay_error_conversion() {
        let (status, Json(body)) =
            relay_error_to_response(RelayError::InvalidRequest("Bad data".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.retryable);

        let (status, Json(body)) = relay_error_to_response(RelayError::NetworkError("reset".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.retryable);
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("cs_test_a1B2c3").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("../account").is_err());
        assert!(validate_id("pi_1?expand=customer").is_err());
    }

    #[test]
    fn test_into_params_defaults() {
        let request = CreateSessionRequest {
            line_items: vec![CheckoutLineItem::price("price_abc", 2)],
            mode: Some("".into()),
            customer_email: Some("".into()),
            ..Default::default()
        };
        let params = request.into_params(None).unwrap();

        assert_eq!(params.mode, "payment");
        assert_eq!(params.ui_mode, "hosted");
        assert!(params.customer_email.is_none());
        assert_eq!(params.line_items[0].quantity, 2);
    }

    #[test]
    fn test_into_params_fallbacks() {
        let inline = CreateSessionRequest {
            currency: Some("eur".into()),
            product_name: Some("Consultation".into()),
            unit_amount: Some(5000),
            ..Default::default()
        }
        .into_params(Some("price_default"))
        .unwrap();
        let data = inline.line_items[0].price_data.as_ref().unwrap();
        assert_eq!(data.product_name, "Consultation");
        assert_eq!(data.unit_amount, 5000);

        let default = CreateSessionRequest::default()
            .into_params(Some("price_default"))
            .unwrap();
        assert_eq!(default.line_items[0].price.as_deref(), Some("price_default"));

        assert!(CreateSessionRequest::default().into_params(None).is_err());
    }
}
