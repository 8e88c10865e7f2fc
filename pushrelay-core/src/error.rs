//! Error taxonomy shared by the registry, relay and HTTP layer

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure category reported to callers of the registry and the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Notification consent was declined. Terminal until the user changes system settings.
    PermissionDenied,
    /// Network or authentication failure talking to the provider. Retryable.
    ProviderUnavailable,
    /// No token was supplied. The caller must register first.
    MissingTarget,
    /// The intent could not be serialized for the provider. Caller bug, not retryable.
    InvalidPayload,
    /// The provider reports the token as unregistered or revoked.
    InvalidTarget,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::MissingTarget => "missing_target",
            ErrorKind::InvalidPayload => "invalid_payload",
            ErrorKind::InvalidTarget => "invalid_target",
        }
    }

    /// Whether repeating the same call may succeed without caller changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::ProviderUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unexpected provider behaviour (e.g. a success response without a message id).
///
/// This is the only failure that escapes the relay as an `Err`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed provider response: {0}")]
pub struct ProviderFault(pub String);

/// Errors returned by the target registry
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no delivery target; register first")]
    MissingTarget,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("delivery target rejected by provider: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Fault(#[from] ProviderFault),
}

impl RelayError {
    /// Failure category, `None` for unexpected faults.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RelayError::PermissionDenied => Some(ErrorKind::PermissionDenied),
            RelayError::ProviderUnavailable(_) => Some(ErrorKind::ProviderUnavailable),
            RelayError::MissingTarget => Some(ErrorKind::MissingTarget),
            RelayError::InvalidPayload(_) => Some(ErrorKind::InvalidPayload),
            RelayError::InvalidTarget(_) => Some(ErrorKind::InvalidTarget),
            RelayError::Fault(_) => None,
        }
    }
}
