//! # Webhook Pipeline
//!
//! Verifier followed by dispatcher. Each delivery ends in exactly one of two
//! dispositions: acknowledged (dispatch ran) or rejected (verification
//! failed and dispatch never ran).

use crate::dispatch::{DispatchOutcome, EventDispatcher};
use crate::webhook::WebhookVerifier;
use chrono::{DateTime, Utc};
use relay_core::VerificationError;
use tracing::{info, warn};

/// Terminal result for one inbound webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Acknowledged(DispatchOutcome),
    Rejected(VerificationError),
}

impl Disposition {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Disposition::Acknowledged(_))
    }
}

/// Stateless; share one instance across all requests
#[derive(Debug, Clone)]
pub struct WebhookPipeline {
    verifier: WebhookVerifier,
    dispatcher: EventDispatcher,
}

impl WebhookPipeline {
    pub fn new(verifier: WebhookVerifier, dispatcher: EventDispatcher) -> Self {
        Self {
            verifier,
            dispatcher,
        }
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Verify then dispatch one delivery
    pub fn process(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Disposition {
        let event = match self.verifier.verify(payload, signature_header, now) {
            Ok(event) => event,
            Err(e) => {
                warn!("Webhook rejected ({}): {}", e.kind(), e);
                return Disposition::Rejected(e);
            }
        };

        info!(
            "Webhook event received: type={}, id={}",
            event.event_type(),
            event.id()
        );

        Disposition::Acknowledged(self.dispatcher.dispatch(&event))
    }
}
