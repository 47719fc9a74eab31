//! # Stripe Gateway
//!
//! `PaymentGateway` over the Stripe REST API. Requests are form-encoded,
//! authenticated with the secret key, and pinned to one API version.

use crate::config::StripeConfig;
use async_trait::async_trait;
use relay_core::{
    Account, Charge, CheckoutLineItem, CheckoutSession, CreateCheckoutSession, PaymentGateway,
    PaymentIntent, RelayError, RelayResult, UpdateCheckoutSession,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const PROVIDER: &str = "stripe";

/// Stripe REST client
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                RelayError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    fn post(&self, path: &str, form: &[(String, String)]) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(form)
    }

    /// Send a request and decode the JSON body, mapping Stripe errors
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RelayResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(error_response) => error_response.error.describe(),
                Err(_) => format!("HTTP {}: {}", status, body),
            };

            return Err(RelayError::ProviderError {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            RelayError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Form-encode line items as `line_items[i][...]`
fn line_item_params(items: &[CheckoutLineItem]) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if let Some(ref price) = item.price {
            params.push((format!("line_items[{}][price]", i), price.clone()));
        }
        if let Some(ref data) = item.price_data {
            params.push((
                format!("line_items[{}][price_data][currency]", i),
                data.currency.to_lowercase(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                data.unit_amount.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                data.product_name.clone(),
            ));
        }
        params.push((
            format!("line_items[{}][quantity]", i),
            item.quantity.to_string(),
        ));
    }
    params
}

fn create_session_params(params: &CreateCheckoutSession) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), params.mode.clone()),
        ("ui_mode".to_string(), params.ui_mode.clone()),
    ];
    if let Some(ref url) = params.success_url {
        form.push(("success_url".to_string(), url.clone()));
    }
    if let Some(ref url) = params.cancel_url {
        form.push(("cancel_url".to_string(), url.clone()));
    }
    if let Some(ref url) = params.return_url {
        form.push(("return_url".to_string(), url.clone()));
    }
    if let Some(ref email) = params.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    form.extend(line_item_params(&params.line_items));
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, params), fields(mode = %params.mode, ui_mode = %params.ui_mode))]
    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> RelayResult<CheckoutSession> {
        params.validate()?;

        let form = create_session_params(params);
        debug!(
            "Creating Stripe checkout session: {} line items",
            params.line_items.len()
        );

        let request = self
            .post("checkout/sessions", &form)
            .header("Idempotency-Key", Uuid::new_v4().to_string());
        let session: CheckoutSession = self.send(request).await?;

        info!(
            "Created Stripe checkout session: id={}, url={}",
            session.id,
            session.url.as_deref().unwrap_or("")
        );
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_checkout_session(&self, id: &str) -> RelayResult<CheckoutSession> {
        self.send(self.get(&format!("checkout/sessions/{}", id))).await
    }

    #[instrument(skip(self, params))]
    async fn update_checkout_session(
        &self,
        id: &str,
        params: &UpdateCheckoutSession,
    ) -> RelayResult<CheckoutSession> {
        params.validate()?;

        let form = line_item_params(&params.line_items);
        self.send(self.post(&format!("checkout/sessions/{}", id), &form))
            .await
    }

    #[instrument(skip(self))]
    async fn get_payment_intent(&self, id: &str) -> RelayResult<PaymentIntent> {
        self.send(self.get(&format!("payment_intents/{}", id))).await
    }

    #[instrument(skip(self))]
    async fn get_charge(&self, id: &str) -> RelayResult<Charge> {
        self.send(self.get(&format!("charges/{}", id))).await
    }

    #[instrument(skip(self))]
    async fn get_account(&self) -> RelayResult<Account> {
        self.send(self.get("account")).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl StripeError {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown error");
        match (&self.error_type, &self.code) {
            (Some(kind), Some(code)) => format!("{} ({}/{})", message, kind, code),
            (Some(kind), None) => format!("{} ({})", message, kind),
            (None, Some(code)) => format!("{} ({})", message, code),
            (None, None) => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::PriceData;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_123").with_api_base_url(server.uri())).unwrap()
    }

    #[test]
    fn test_create_session_params() {
        let mut params = CreateCheckoutSession::new(vec![
            CheckoutLineItem::price("price_abc", 2),
            CheckoutLineItem::inline(
                PriceData {
                    currency: "USD".into(),
                    unit_amount: 1500,
                    product_name: "Widget".into(),
                },
                1,
            ),
        ]);
        params.success_url = Some("https://example.com/success".into());
        params.customer_email = Some("buyer@example.com".into());

        let form = create_session_params(&params);
        let has = |k: &str, v: &str| form.iter().any(|(fk, fv)| fk == k && fv == v);

        assert!(has("mode", "payment"));
        assert!(has("ui_mode", "hosted"));
        assert!(has("success_url", "https://example.com/success"));
        assert!(has("customer_email", "buyer@example.com"));
        assert!(has("line_items[0][price]", "price_abc"));
        assert!(has("line_items[0][quantity]", "2"));
        assert!(has("line_items[1][price_data][currency]", "usd"));
        assert!(has("line_items[1][price_data][unit_amount]", "1500"));
        assert!(has("line_items[1][price_data][product_data][name]", "Widget"));
        assert!(!form.iter().any(|(k, _)| k == "cancel_url"));
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_123"))
            .and(header("Stripe-Version", "2024-12-18.acacia"))
            .and(header_exists("Idempotency-Key"))
            .and(body_string_contains("mode=payment"))
            .and(body_string_contains("price_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "object": "checkout.session",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "status": "open"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = CreateCheckoutSession::new(vec![CheckoutLineItem::price("price_abc", 1)]);
        let session = gateway(&server).await.create_checkout_session(&params).await.unwrap();

        assert_eq!(session.id, "cs_test_1");
        assert_eq!(
            session.url.as_deref(),
            Some("https://checkout.stripe.com/c/pay/cs_test_1")
        );
        assert_eq!(session.extra.get("object"), Some(&json!("checkout.session")));
    }

    #[tokio::test]
    async fn test_invalid_params_never_reach_stripe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .create_checkout_session(&CreateCheckoutSession::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_update_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .and(body_string_contains("price_new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cs_test_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let params = UpdateCheckoutSession {
            line_items: vec![CheckoutLineItem::price("price_new", 1)],
        };
        let session = gateway(&server)
            .await
            .update_checkout_session("cs_test_1", &params)
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_1");
    }

    #[tokio::test]
    async fn test_get_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1", "status": "complete", "amount_total": 4200
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_1", "status": "succeeded", "amount": 4200
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1", "amount": 4200, "paid": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "acct_1", "country": "US"
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;

        let session = gateway.get_checkout_session("cs_test_1").await.unwrap();
        assert_eq!(session.status.as_deref(), Some("complete"));
        assert_eq!(session.amount_total, Some(4200));

        let intent = gateway.get_payment_intent("pi_1").await.unwrap();
        assert_eq!(intent.amount, 4200);

        let charge = gateway.get_charge("ch_1").await.unwrap();
        assert!(charge.paid);

        let account = gateway.get_account().await.unwrap();
        assert_eq!(account.id, "acct_1");
        assert_eq!(account.extra.get("country"), Some(&json!("US")));
    }

    #[tokio::test]
    async fn test_stripe_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges/ch_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "message": "No such charge: 'ch_missing'",
                    "type": "invalid_request_error",
                    "code": "resource_missing"
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).await.get_charge("ch_missing").await.unwrap_err();
        match &err {
            RelayError::ProviderError {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "stripe");
                assert_eq!(*status, 404);
                assert!(message.contains("No such charge"));
                assert!(message.contains("resource_missing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/account"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = gateway(&server).await.get_account().await.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(err.is_retryable());
    }
}
