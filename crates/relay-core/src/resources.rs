//! # Provider Resources
//!
//! Request parameters and response objects exchanged with the payment
//! provider. Response types name the fields the relay reads and keep
//! everything else in a flattened map, so serializing them back out
//! returns the provider's object unchanged.

use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default checkout mode when the client leaves it out
pub const DEFAULT_CHECKOUT_MODE: &str = "payment";

/// Default UI mode when the client leaves it out
pub const DEFAULT_UI_MODE: &str = "hosted";

// =============================================================================
// Request Parameters
// =============================================================================

/// Inline price for a line item that has no pre-created price id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    /// Three-letter ISO currency code, lowercase
    pub currency: String,
    /// Amount in the smallest currency unit
    pub unit_amount: i64,
    /// Product display name shown on the hosted page
    pub product_name: String,
}

/// A line item in a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    /// Pre-created price id (`price_...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Inline price, alternative to `price`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_data: Option<PriceData>,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl CheckoutLineItem {
    /// Line item referencing an existing price
    pub fn price(price_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            price: Some(price_id.into()),
            price_data: None,
            quantity,
        }
    }

    /// Line item with an inline price
    pub fn inline(price_data: PriceData, quantity: i64) -> Self {
        Self {
            price: None,
            price_data: Some(price_data),
            quantity,
        }
    }

    fn validate(&self, index: usize) -> RelayResult<()> {
        match (&self.price, &self.price_data) {
            (Some(_), Some(_)) => {
                return Err(RelayError::InvalidRequest(format!(
                    "line_items[{}]: set either price or price_data, not both",
                    index
                )))
            }
            (None, None) => {
                return Err(RelayError::InvalidRequest(format!(
                    "line_items[{}]: price or price_data is required",
                    index
                )))
            }
            _ => {}
        }
        if self.quantity < 1 {
            return Err(RelayError::InvalidRequest(format!(
                "line_items[{}]: quantity must be at least 1",
                index
            )));
        }
        Ok(())
    }
}

/// Parameters for creating a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckoutSession {
    pub line_items: Vec<CheckoutLineItem>,
    pub mode: String,
    pub ui_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
    /// Used instead of success/cancel URLs by embedded UI mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

impl CreateCheckoutSession {
    /// New session parameters with default mode and UI mode
    pub fn new(line_items: Vec<CheckoutLineItem>) -> Self {
        Self {
            line_items,
            mode: DEFAULT_CHECKOUT_MODE.to_string(),
            ui_mode: DEFAULT_UI_MODE.to_string(),
            success_url: None,
            cancel_url: None,
            return_url: None,
            customer_email: None,
        }
    }

    /// Check the parameters before they go over the wire
    pub fn validate(&self) -> RelayResult<()> {
        if self.line_items.is_empty() {
            return Err(RelayError::InvalidRequest(
                "Checkout session has no line items".to_string(),
            ));
        }
        for (i, item) in self.line_items.iter().enumerate() {
            item.validate(i)?;
        }
        Ok(())
    }
}

/// Parameters for updating a checkout session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCheckoutSession {
    /// Replacement line items; empty leaves the session's items alone
    #[serde(default)]
    pub line_items: Vec<CheckoutLineItem>,
}

impl UpdateCheckoutSession {
    pub fn validate(&self) -> RelayResult<()> {
        for (i, item) in self.line_items.iter().enumerate() {
            item.validate(i)?;
        }
        Ok(())
    }
}

// =============================================================================
// Response Objects
// =============================================================================

/// Customer details collected by the hosted checkout page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A checkout session as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckoutSession {
    /// Email prefilled at creation, else the one the customer typed in
    pub fn email(&self) -> Option<&str> {
        self.customer_email.as_deref().or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|d| d.email.as_deref())
        })
    }

    /// Check if payment was collected
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// A payment intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The account that owns the API key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
