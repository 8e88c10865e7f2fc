//! HTTP request and response bodies for the notification endpoint

use crate::error::ErrorKind;
use crate::models::action::Action;
use serde::{Deserialize, Serialize};

/// Body of `POST /notification`.
///
/// `action` selects the variant. The older `url` field is shorthand for
/// `{"type": "open_url", "url": ...}` and is ignored when `action` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl NotificationRequest {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Resolve the requested action.
    pub fn resolved_action(&self) -> Action {
        if let Some(action) = &self.action {
            return action.clone();
        }
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Action::OpenUrl {
                url: url.to_string(),
            },
            _ => Action::None,
        }
    }
}

/// 200 response of `POST /notification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// Error body returned with every non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

/// 201 response of `POST /api/v1/loopback/tokens`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub transport_ready: bool,
}
