//! # Webhook Event Dispatch
//!
//! Routes a [`VerifiedEvent`] to the handler registered for its type tag.
//!
//! Dispatch never fails the request: by the time it runs the webhook has
//! been authenticated and will be acknowledged. Handler errors are logged
//! and reported in the [`DispatchOutcome`], and types without a handler go
//! to the fallback.

use crate::webhook::VerifiedEvent;
use relay_core::{Charge, CheckoutSession, PaymentIntent, RelayError, RelayResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const CHARGE_SUCCEEDED: &str = "charge.succeeded";

/// Handles one kind of webhook event.
///
/// Deliveries are retried and may arrive more than once or out of order, so
/// implementations must be idempotent. Anything slow (I/O, downstream
/// calls) should be spawned rather than done inline, since dispatch sits on
/// the acknowledgement path.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&VerifiedEvent) -> RelayResult<()> + Send + Sync,
{
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()> {
        self(event)
    }
}

/// Type alias for a shared handler
pub type BoxedEventHandler = Arc<dyn EventHandler>;

fn decode<T: serde::de::DeserializeOwned>(event: &VerifiedEvent) -> RelayResult<T> {
    event.data_object().map_err(|e| {
        RelayError::Serialization(format!(
            "Failed to decode data.object of {}: {}",
            event.event_type(),
            e
        ))
    })
}

/// Logs completed checkout sessions
pub struct CheckoutCompletedHandler;

impl EventHandler for CheckoutCompletedHandler {
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()> {
        let session: CheckoutSession = decode(event)?;
        info!(
            "Checkout session completed: id={}, amount={}, email={}, paid={}",
            session.id,
            session.amount_total.unwrap_or_default(),
            session.email().unwrap_or(""),
            session.is_paid()
        );
        Ok(())
    }
}

/// Logs succeeded payment intents
pub struct PaymentIntentSucceededHandler;

impl EventHandler for PaymentIntentSucceededHandler {
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()> {
        let intent: PaymentIntent = decode(event)?;
        info!(
            "PaymentIntent succeeded: id={}, amount={}",
            intent.id, intent.amount
        );
        Ok(())
    }
}

/// Logs succeeded charges
pub struct ChargeSucceededHandler;

impl EventHandler for ChargeSucceededHandler {
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()> {
        let charge: Charge = decode(event)?;
        info!(
            "Charge succeeded: id={}, amount={}, paid={}",
            charge.id, charge.amount, charge.paid
        );
        Ok(())
    }
}

/// Default fallback: logs the type and moves on
pub struct LoggingFallbackHandler;

impl EventHandler for LoggingFallbackHandler {
    fn handle(&self, event: &VerifiedEvent) -> RelayResult<()> {
        info!(
            "Unhandled event type: {} (id={})",
            event.event_type(),
            event.id()
        );
        Ok(())
    }
}

/// What happened to one event. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler ran to completion
    Handled { event_type: String },
    /// A registered handler failed; logged and swallowed
    HandlerFailed { event_type: String, reason: String },
    /// No handler for this type; the fallback ran
    Unrecognized { event_type: String },
}

impl DispatchOutcome {
    pub fn event_type(&self) -> &str {
        match self {
            DispatchOutcome::Handled { event_type }
            | DispatchOutcome::HandlerFailed { event_type, .. }
            | DispatchOutcome::Unrecognized { event_type } => event_type,
        }
    }

    /// Short tag for logs and acknowledgement bodies
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Handled { .. } => "handled",
            DispatchOutcome::HandlerFailed { .. } => "handler_failed",
            DispatchOutcome::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Event type → handler registry with a mandatory fallback
#[derive(Clone)]
pub struct EventDispatcher {
    handlers: HashMap<String, BoxedEventHandler>,
    fallback: BoxedEventHandler,
}

impl EventDispatcher {
    /// Empty registry; everything goes to `fallback`
    pub fn new(fallback: BoxedEventHandler) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback,
        }
    }

    /// Registry with the built-in logging handlers
    pub fn with_default_handlers() -> Self {
        Self::new(Arc::new(LoggingFallbackHandler))
            .with_handler(CHECKOUT_SESSION_COMPLETED, Arc::new(CheckoutCompletedHandler))
            .with_handler(PAYMENT_INTENT_SUCCEEDED, Arc::new(PaymentIntentSucceededHandler))
            .with_handler(CHARGE_SUCCEEDED, Arc::new(ChargeSucceededHandler))
    }

    /// Register a handler, returning the one it replaced
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        handler: BoxedEventHandler,
    ) -> Option<BoxedEventHandler> {
        self.handlers.insert(event_type.into(), handler)
    }

    /// Register with builder pattern
    pub fn with_handler(mut self, event_type: impl Into<String>, handler: BoxedEventHandler) -> Self {
        self.register(event_type, handler);
        self
    }

    /// Check if a type has its own handler
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Registered event types, sorted
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Route an event to its handler
    pub fn dispatch(&self, event: &VerifiedEvent) -> DispatchOutcome {
        let event_type = event.event_type().to_string();

        let Some(handler) = self.handlers.get(event.event_type()) else {
            if let Err(e) = self.fallback.handle(event) {
                error!("Fallback handler error for {}: {}", event_type, e);
            }
            return DispatchOutcome::Unrecognized { event_type };
        };

        match handler.handle(event) {
            Ok(()) => DispatchOutcome::Handled { event_type },
            Err(e) => {
                error!(
                    "Webhook handler error: type={}, id={}: {}",
                    event_type,
                    event.id(),
                    e
                );
                DispatchOutcome::HandlerFailed {
                    event_type,
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_types", &self.event_types())
            .finish_non_exhaustive()
    }
}
