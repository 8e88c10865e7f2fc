//! Dispatch result returned for every relay call

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Outcome of one dispatch call. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Provider failure text, surfaced verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DispatchResult {
    pub fn delivered(provider_message_id: String) -> Self {
        Self {
            success: true,
            provider_message_id: Some(provider_message_id),
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }
}
