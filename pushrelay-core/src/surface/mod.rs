//! Delivery surfaces: where a delivered notification is shown and its action interpreted
//!
//! Two implementations of [`DeliverySurface`] exist, one per [`RuntimeContext`]. The
//! [`Device`] routes each delivery to exactly one of them, picked from the context at the
//! moment of delivery.

mod background;
mod device;
mod foreground;
mod platform;
mod simulated;

pub use background::{ActivationEvent, ActivationOutcome, BackgroundSurface};
pub use device::Device;
pub use foreground::{ForegroundSurface, MAX_PENDING_TOASTS};
pub use platform::{Effect, InstanceId, Platform, SurfaceError, SystemNotification, Toast};
pub use simulated::SimulatedPlatform;

use crate::models::{Action, DataMap, TAG_KEY};
use crate::providers::PushMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Tag used when a notification carries none.
pub const DEFAULT_TAG: &str = "default";
pub const OPEN_ACTION: &str = "open";
pub const CLOSE_ACTION: &str = "close";
/// Title shown when a delivered notification has none.
pub const FALLBACK_TITLE: &str = "New Message";

/// A push as it arrives on the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: DataMap,
}

impl DeliveredNotification {
    pub fn action(&self) -> Action {
        Action::decode(&self.data)
    }

    pub fn tag(&self) -> &str {
        self.data
            .get(TAG_KEY)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TAG)
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_TITLE)
    }

    pub fn display_body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

impl From<PushMessage> for DeliveredNotification {
    fn from(message: PushMessage) -> Self {
        Self {
            title: Some(message.title),
            body: Some(message.body),
            data: message.data,
        }
    }
}

/// Which handler is eligible for deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeContext {
    /// The application is the active, interactive context
    Foreground,
    /// The application is not active; a detached handler runs
    Background,
}

/// How a delivery was surfaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surfaced {
    Toast { id: Uuid },
    System { tag: String },
}

/// Capability shared by the foreground and background handlers.
#[async_trait]
pub trait DeliverySurface: Send + Sync {
    fn context(&self) -> RuntimeContext;

    /// Surface a delivered notification. Action effects are deferred to activation.
    async fn deliver(&self, notification: DeliveredNotification)
        -> Result<Surfaced, SurfaceError>;
}

/// Resolve a url or route against the application origin.
pub(crate) fn resolve_location(origin: &Url, location: &str) -> Url {
    origin.join(location).unwrap_or_else(|e| {
        tracing::warn!(location, error = %e, "unresolvable location, using origin");
        origin.clone()
    })
}
