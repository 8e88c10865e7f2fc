//! Push providers: outbound send transport and token issuance
//!
//! **Transport errors**: every provider maps its failures onto [`TransportError`]. The relay
//! turns those into a failed [`DispatchResult`](crate::models::DispatchResult), except
//! [`TransportError::Malformed`], which escapes as a fault.

mod fcm;
mod loopback;
mod oauth;

pub use fcm::{FcmCredentials, FcmTransport};
pub use oauth::{
    AccessTokenProvider, ServiceAccountKey, TokenGrant, ACCESS_TOKEN_ENV, CLIENT_EMAIL_ENV,
    FCM_SCOPE, GOOGLE_TOKEN_URI, METADATA_TOKEN_URL, PRIVATE_KEY_ENV, REFRESH_MARGIN,
};
pub use loopback::{LoopbackProvider, ProviderCall};

use crate::error::ErrorKind;
use crate::models::{DataMap, NotificationIntent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from provider calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("provider unreachable: {0}")]
    Unavailable(String),

    #[error("provider authentication failed: {0}")]
    Unauthenticated(String),

    #[error("token not registered: {0}")]
    Unregistered(String),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Failure category for a dispatch result, `None` for malformed responses.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TransportError::Unavailable(_) | TransportError::Unauthenticated(_) => {
                Some(ErrorKind::ProviderUnavailable)
            }
            TransportError::Unregistered(_) => Some(ErrorKind::InvalidTarget),
            TransportError::Rejected(_) => Some(ErrorKind::InvalidPayload),
            TransportError::Malformed(_) => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Malformed(e.to_string())
        } else {
            TransportError::Unavailable(e.to_string())
        }
    }
}

/// One send request as the provider sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: DataMap,
}

impl PushMessage {
    pub fn from_intent(token: &str, intent: &NotificationIntent) -> Self {
        Self {
            token: token.to_string(),
            title: intent.title().to_string(),
            body: intent.body().to_string(),
            data: intent.extra().clone(),
        }
    }
}

/// Outbound send path to a push provider (e.g. FCM).
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Provider name for logging (e.g. "fcm").
    fn name(&self) -> &str;

    /// Send one message. Returns the provider's message id.
    async fn send(&self, message: &PushMessage) -> Result<String, TransportError>;
}

/// Device-side token issuance.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a token addressing this device.
    async fn request_token(&self) -> Result<String, TransportError>;

    /// Invalidate a token at the provider.
    async fn delete_token(&self, token: &str) -> Result<(), TransportError>;
}
