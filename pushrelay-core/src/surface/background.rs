//! Background surface: system notification now, action on activation

use super::platform::{Effect, Platform, SurfaceError, SystemNotification};
use super::{
    resolve_location, DeliveredNotification, DeliverySurface, RuntimeContext, Surfaced,
    CLOSE_ACTION, OPEN_ACTION,
};
use crate::models::{Action, DataMap};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Activation of a visible system notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEvent {
    pub tag: String,
    /// Selected sub-action; `None` when the notification body was clicked
    pub action: Option<String>,
    pub data: DataMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// `close` sub-action: dismissed, nothing else happens
    Dismissed,
    /// Unknown sub-action
    Ignored,
    Performed(Effect),
}

/// Detached handler used while the application is not the active context.
pub struct BackgroundSurface {
    platform: Arc<dyn Platform>,
    origin: Url,
}

impl BackgroundSurface {
    pub fn new(platform: Arc<dyn Platform>, origin: Url) -> Self {
        Self { platform, origin }
    }

    /// Resume after the user activated a notification.
    ///
    /// A focused instance receives the decoded action as a message; otherwise a new
    /// instance opens at the action's location.
    pub async fn on_activation(
        &self,
        event: ActivationEvent,
    ) -> Result<ActivationOutcome, SurfaceError> {
        self.platform.close_notification(&event.tag).await;

        match event.action.as_deref() {
            Some(CLOSE_ACTION) => {
                tracing::debug!(tag = %event.tag, "notification dismissed");
                return Ok(ActivationOutcome::Dismissed);
            }
            Some(OPEN_ACTION) | None => {}
            Some(other) => {
                tracing::warn!(tag = %event.tag, sub_action = other, "unknown notification sub-action");
                return Ok(ActivationOutcome::Ignored);
            }
        }

        let action = Action::decode(&event.data);
        let effect = match self.platform.focused_instance().await {
            Some(instance) => Effect::PostMessage { instance, action },
            None => Effect::OpenWindow {
                url: background_location(&action, &self.origin),
            },
        };

        self.platform.perform(&effect).await?;
        tracing::info!(tag = %event.tag, effect = ?effect, "notification activated");
        Ok(ActivationOutcome::Performed(effect))
    }

    /// Notification closed without activation
    pub fn on_close(&self, tag: &str) {
        tracing::debug!(tag, "notification closed");
    }
}

/// Where a new instance opens for `action`.
fn background_location(action: &Action, origin: &Url) -> Url {
    match action {
        Action::OpenUrl { url } => resolve_location(origin, url),
        Action::Navigate { route } => resolve_location(origin, route),
        Action::Refresh | Action::Custom { .. } | Action::None => origin.clone(),
    }
}

#[async_trait]
impl DeliverySurface for BackgroundSurface {
    fn context(&self) -> RuntimeContext {
        RuntimeContext::Background
    }

    async fn deliver(
        &self,
        notification: DeliveredNotification,
    ) -> Result<Surfaced, SurfaceError> {
        let system = SystemNotification {
            tag: notification.tag().to_string(),
            title: notification.display_title().to_string(),
            body: notification.display_body().to_string(),
            actions: vec![OPEN_ACTION.to_string(), CLOSE_ACTION.to_string()],
            data: notification.data,
        };

        self.platform.show_notification(&system).await?;
        tracing::info!(tag = %system.tag, "background notification shown");
        Ok(Surfaced::System { tag: system.tag })
    }
}
