//! Loopback provider: issues tokens and delivers pushes in-process.
//!
//! Stands in for a real push service in demos and tests. Every outbound call is recorded
//! so callers can assert on what reached the provider.

use crate::models::redact_token;
use crate::providers::{PushMessage, PushTransport, TokenSource, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    RequestToken,
    Send { token: String },
    DeleteToken { token: String },
}

#[derive(Default)]
struct LoopbackState {
    /// Active tokens -> messages delivered to that device, not yet taken
    inboxes: DashMap<String, Vec<PushMessage>>,
    calls: RwLock<Vec<ProviderCall>>,
    unreachable: AtomicBool,
}

/// In-process provider implementing both the send transport and token issuance.
#[derive(Clone, Default)]
pub struct LoopbackProvider {
    inner: Arc<LoopbackState>,
}

impl LoopbackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a network outage. While unreachable every call fails with `Unavailable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// All calls received so far, in order
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.inner.calls.read().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.inner
            .calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, ProviderCall::Send { .. }))
            .count()
    }

    pub fn is_active(&self, token: &str) -> bool {
        self.inner.inboxes.contains_key(token)
    }

    /// Drain messages delivered to `token`.
    pub fn take_delivered(&self, token: &str) -> Vec<PushMessage> {
        self.inner
            .inboxes
            .get_mut(token)
            .map(|mut inbox| std::mem::take(inbox.value_mut()))
            .unwrap_or_default()
    }

    async fn record(&self, call: ProviderCall) {
        self.inner.calls.write().await.push(call);
    }

    fn check_reachable(&self) -> Result<(), TransportError> {
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(
                "loopback provider offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PushTransport for LoopbackProvider {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn send(&self, message: &PushMessage) -> Result<String, TransportError> {
        self.record(ProviderCall::Send {
            token: message.token.clone(),
        })
        .await;
        self.check_reachable()?;

        match self.inner.inboxes.get_mut(&message.token) {
            Some(mut inbox) => {
                inbox.push(message.clone());
                Ok(format!("projects/loopback/messages/{}", Uuid::new_v4()))
            }
            None => Err(TransportError::Unregistered(redact_token(&message.token))),
        }
    }
}

#[async_trait]
impl TokenSource for LoopbackProvider {
    async fn request_token(&self) -> Result<String, TransportError> {
        self.record(ProviderCall::RequestToken).await;
        self.check_reachable()?;

        let token = format!("lb-{}", Uuid::new_v4().simple());
        self.inner.inboxes.insert(token.clone(), Vec::new());
        Ok(token)
    }

    async fn delete_token(&self, token: &str) -> Result<(), TransportError> {
        self.record(ProviderCall::DeleteToken {
            token: token.to_string(),
        })
        .await;
        self.check_reachable()?;

        self.inner.inboxes.remove(token);
        Ok(())
    }
}
