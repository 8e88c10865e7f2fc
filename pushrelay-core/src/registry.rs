//! Target registry: owns registration, refresh and revocation of this device's target

use crate::error::{ProviderFault, RelayError};
use crate::models::{redact_token, DeliveryTarget};
use crate::providers::{TokenSource, TransportError};
use crate::services::logging::log_registration_event;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Notification consent as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet; asking will show a prompt
    Prompt,
}

/// Platform notification-consent capability.
#[async_trait]
pub trait ConsentGate: Send + Sync {
    /// Current consent without prompting. Platforms without notification support report `Denied`.
    fn state(&self) -> PermissionState;

    /// Show the user-facing permission prompt and return the decision.
    async fn prompt(&self) -> PermissionState;
}

/// Holds zero or one active delivery target for this application instance.
pub struct TargetRegistry {
    consent: Arc<dyn ConsentGate>,
    tokens: Arc<dyn TokenSource>,
    current: RwLock<Option<DeliveryTarget>>,
}

impl TargetRegistry {
    pub fn new(consent: Arc<dyn ConsentGate>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            consent,
            tokens,
            current: RwLock::new(None),
        }
    }

    /// Register this device, prompting for consent only when it is undecided.
    ///
    /// With a valid target already held, returns it without prompting or fetching.
    pub async fn register(&self) -> Result<DeliveryTarget, RelayError> {
        match self.consent.state() {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                log_registration_event("permission_denied", None);
                return Err(RelayError::PermissionDenied);
            }
            PermissionState::Prompt => {
                if self.consent.prompt().await != PermissionState::Granted {
                    log_registration_event("permission_declined", None);
                    return Err(RelayError::PermissionDenied);
                }
            }
        }

        if let Some(target) = self.current().await {
            return Ok(target);
        }

        // Concurrent registrations serialize here; only one fetches a token.
        let mut current = self.current.write().await;
        if let Some(target) = current.as_ref().filter(|t| t.is_valid()) {
            return Ok(target.clone());
        }

        let target = self.fetch_target().await?;
        log_registration_event("registered", Some(&target.redacted_id()));
        *current = Some(target.clone());
        Ok(target)
    }

    /// Replace the held token with a fresh one. Never prompts.
    pub async fn refresh(&self) -> Result<DeliveryTarget, RelayError> {
        if self.consent.state() != PermissionState::Granted {
            return Err(RelayError::PermissionDenied);
        }

        let mut current = self.current.write().await;
        let target = self.fetch_target().await?;
        log_registration_event("refreshed", Some(&target.redacted_id()));
        *current = Some(target.clone());
        Ok(target)
    }

    /// Invalidate `target` at the provider and clear local state.
    ///
    /// On failure the held target is kept so the caller can retry.
    pub async fn revoke(&self, target: &DeliveryTarget) -> Result<(), RelayError> {
        self.tokens
            .delete_token(&target.id)
            .await
            .map_err(map_transport_error)?;

        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|held| held.id == target.id) {
            *current = None;
        }
        log_registration_event("revoked", Some(&target.redacted_id()));
        Ok(())
    }

    /// Provider-signaled invalidation. Marks the held target revoked without a provider call.
    /// Returns whether the held target matched.
    pub async fn invalidate(&self, token: &str) -> bool {
        let mut current = self.current.write().await;
        match current.as_mut() {
            Some(held) if held.id == token && !held.revoked => {
                held.revoked = true;
                log_registration_event("invalidated", Some(&redact_token(token)));
                true
            }
            _ => false,
        }
    }

    /// The held target, if still valid
    pub async fn current(&self) -> Option<DeliveryTarget> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_valid())
            .cloned()
    }

    async fn fetch_target(&self) -> Result<DeliveryTarget, RelayError> {
        let token = self
            .tokens
            .request_token()
            .await
            .map_err(map_transport_error)?;
        if token.trim().is_empty() {
            return Err(RelayError::ProviderUnavailable(
                "provider returned an empty token".to_string(),
            ));
        }
        Ok(DeliveryTarget::new(token))
    }
}

fn map_transport_error(e: TransportError) -> RelayError {
    match e {
        TransportError::Malformed(detail) => RelayError::Fault(ProviderFault(detail)),
        other => RelayError::ProviderUnavailable(other.to_string()),
    }
}
