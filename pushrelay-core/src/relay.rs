//! Dispatch relay: forwards one intent to the provider transport per call

use crate::error::{ErrorKind, ProviderFault};
use crate::models::{redact_token, DeliveryTarget, DispatchResult, NotificationIntent, ACTION_KEY};
use crate::providers::{PushMessage, PushTransport, TransportError};
use crate::services::logging::log_dispatch;
use std::sync::Arc;

/// Provider limit on one message (title, body and data), in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Sends intents through a single provider transport.
///
/// No internal retry, queuing or batching: each call is one request that runs to completion.
#[derive(Clone)]
pub struct DispatchRelay {
    transport: Arc<dyn PushTransport>,
}

impl DispatchRelay {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self { transport }
    }

    pub fn provider(&self) -> &str {
        self.transport.name()
    }

    /// Send `intent` to the device addressed by `target`.
    ///
    /// Failures come back as a failed [`DispatchResult`]; only a malformed provider
    /// response is returned as `Err`.
    pub async fn dispatch(
        &self,
        target: &str,
        intent: &NotificationIntent,
    ) -> Result<DispatchResult, ProviderFault> {
        let token = target.trim();
        if token.is_empty() {
            log_dispatch(self.provider(), "", ErrorKind::MissingTarget.as_str(), None);
            return Ok(DispatchResult::failed(
                ErrorKind::MissingTarget,
                "a delivery target token is required",
            ));
        }

        if let Err(reason) = validate_payload(intent) {
            log_dispatch(
                self.provider(),
                &redact_token(token),
                ErrorKind::InvalidPayload.as_str(),
                Some(&reason),
            );
            return Ok(DispatchResult::failed(ErrorKind::InvalidPayload, reason));
        }

        let message = PushMessage::from_intent(token, intent);
        match self.transport.send(&message).await {
            Ok(message_id) => {
                log_dispatch(
                    self.provider(),
                    &redact_token(token),
                    "delivered",
                    Some(&message_id),
                );
                Ok(DispatchResult::delivered(message_id))
            }
            Err(TransportError::Malformed(detail)) => {
                tracing::error!(
                    provider = self.provider(),
                    error = %detail,
                    "provider returned a malformed response"
                );
                Err(ProviderFault(detail))
            }
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::ProviderUnavailable);
                tracing::error!(
                    provider = self.provider(),
                    error_kind = %kind,
                    error = %e,
                    "provider delivery failed"
                );
                Ok(DispatchResult::failed(kind, e.to_string()))
            }
        }
    }

    /// Dispatch to a registry target. A target already marked revoked fails with
    /// `InvalidTarget` without reaching the provider.
    pub async fn dispatch_to(
        &self,
        target: &DeliveryTarget,
        intent: &NotificationIntent,
    ) -> Result<DispatchResult, ProviderFault> {
        if target.revoked {
            return Ok(DispatchResult::failed(
                ErrorKind::InvalidTarget,
                format!("target {} was revoked", target.redacted_id()),
            ));
        }
        self.dispatch(&target.id, intent).await
    }

    /// Dispatch to each target in turn, one request at a time. Results follow input order.
    pub async fn dispatch_all(
        &self,
        targets: &[String],
        intent: &NotificationIntent,
    ) -> Vec<Result<DispatchResult, ProviderFault>> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(self.dispatch(target, intent).await);
        }
        results
    }
}

fn validate_payload(intent: &NotificationIntent) -> Result<(), String> {
    if !intent.extra().contains_key(ACTION_KEY) {
        return Err(format!("data is missing the '{}' discriminator", ACTION_KEY));
    }
    let size = intent.payload_size();
    if size > MAX_PAYLOAD_BYTES {
        return Err(format!(
            "payload is {} bytes (limit {})",
            size, MAX_PAYLOAD_BYTES
        ));
    }
    Ok(())
}
