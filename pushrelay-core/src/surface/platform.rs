//! Platform capabilities the delivery surfaces drive

use crate::models::{Action, DataMap};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Errors reported by the platform layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("platform rejected the request: {0}")]
    Platform(String),

    #[error("background handler registration failed: {0}")]
    Registration(String),
}

/// A running instance (window/tab) of the receiving application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-disruptive in-app alert with an explicit activation affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    /// Whether the toast offers activation (false when there is nothing to run)
    pub activatable: bool,
}

/// System-level notification shown while the application is not the active context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNotification {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub data: DataMap,
    /// Sub-actions offered on the notification
    pub actions: Vec<String>,
}

/// Local effect performed on the receiving device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new application instance (or tab) at `url`
    OpenWindow { url: Url },
    /// Move the current instance to `url`
    Navigate { url: Url },
    /// Reload the current instance
    Reload,
    /// Hand custom fields to the application
    Custom { fields: DataMap },
    /// Relay a decoded action to a running instance as an in-process message
    PostMessage { instance: InstanceId, action: Action },
}

/// Runtime host of the receiving application (browser, desktop shell, simulator).
#[async_trait]
pub trait Platform: Send + Sync {
    /// Register the detached background handler under a well-known path.
    async fn register_background_handler(&self, path: &str) -> Result<(), SurfaceError>;

    async fn show_toast(&self, toast: &Toast) -> Result<(), SurfaceError>;

    /// Show a system notification. Must replace a visible notification with the same tag.
    async fn show_notification(
        &self,
        notification: &SystemNotification,
    ) -> Result<(), SurfaceError>;

    async fn close_notification(&self, tag: &str);

    /// The instance currently holding focus, if any.
    async fn focused_instance(&self) -> Option<InstanceId>;

    async fn perform(&self, effect: &Effect) -> Result<(), SurfaceError>;
}
