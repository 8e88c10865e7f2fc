//! Foreground surface: in-app toast, effect only on explicit activation

use super::platform::{Effect, Platform, SurfaceError, Toast};
use super::{resolve_location, DeliveredNotification, DeliverySurface, RuntimeContext, Surfaced};
use crate::models::Action;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

/// Activatable toasts kept at most; the oldest is forgotten first.
pub const MAX_PENDING_TOASTS: usize = 64;

/// Toasts awaiting activation, oldest first
#[derive(Default)]
struct PendingToasts {
    order: VecDeque<Uuid>,
    actions: HashMap<Uuid, Action>,
}

impl PendingToasts {
    fn insert(&mut self, id: Uuid, action: Action) {
        self.order.push_back(id);
        self.actions.insert(id, action);
        while self.actions.len() > MAX_PENDING_TOASTS {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.actions.remove(&oldest).is_some() {
                tracing::debug!(toast_id = %oldest, "pending toast expired without activation");
            }
        }
    }

    fn remove(&mut self, id: &Uuid) -> Option<Action> {
        let action = self.actions.remove(id)?;
        self.order.retain(|queued| queued != id);
        Some(action)
    }

    fn len(&self) -> usize {
        self.actions.len()
    }
}

/// Handler used while the application is the active context.
pub struct ForegroundSurface {
    platform: Arc<dyn Platform>,
    origin: Url,
    pending: RwLock<PendingToasts>,
}

impl ForegroundSurface {
    pub fn new(platform: Arc<dyn Platform>, origin: Url) -> Self {
        Self {
            platform,
            origin,
            pending: RwLock::new(PendingToasts::default()),
        }
    }

    /// User activated a toast. Runs its action once; later calls, and toasts pushed out of
    /// the pending table by newer ones, return `None`.
    pub async fn activate(&self, toast_id: Uuid) -> Result<Option<Effect>, SurfaceError> {
        let Some(action) = self.pending.write().await.remove(&toast_id) else {
            return Ok(None);
        };
        self.execute(&action).await
    }

    /// Toast closed without activation
    pub async fn dismiss(&self, toast_id: Uuid) -> bool {
        self.pending.write().await.remove(&toast_id).is_some()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    /// Run an action relayed by the background handler. The user already activated the
    /// system notification, so the effect runs immediately.
    pub async fn handle_relayed(&self, action: &Action) -> Result<Option<Effect>, SurfaceError> {
        self.execute(action).await
    }

    async fn execute(&self, action: &Action) -> Result<Option<Effect>, SurfaceError> {
        let Some(effect) = foreground_effect(action, &self.origin) else {
            tracing::debug!("activated notification carries no action");
            return Ok(None);
        };
        self.platform.perform(&effect).await?;
        Ok(Some(effect))
    }
}

fn foreground_effect(action: &Action, origin: &Url) -> Option<Effect> {
    match action {
        Action::OpenUrl { url } => Some(Effect::OpenWindow {
            url: resolve_location(origin, url),
        }),
        Action::Navigate { route } => Some(Effect::Navigate {
            url: resolve_location(origin, route),
        }),
        Action::Refresh => Some(Effect::Reload),
        Action::Custom { fields } => Some(Effect::Custom {
            fields: fields.clone(),
        }),
        Action::None => None,
    }
}

#[async_trait]
impl DeliverySurface for ForegroundSurface {
    fn context(&self) -> RuntimeContext {
        RuntimeContext::Foreground
    }

    async fn deliver(
        &self,
        notification: DeliveredNotification,
    ) -> Result<Surfaced, SurfaceError> {
        let action = notification.action();
        let toast = Toast {
            id: Uuid::new_v4(),
            title: notification.display_title().to_string(),
            body: notification.display_body().to_string(),
            activatable: action != Action::None,
        };

        self.platform.show_toast(&toast).await?;
        if toast.activatable {
            self.pending.write().await.insert(toast.id, action);
        }

        tracing::info!(
            toast_id = %toast.id,
            action = notification.action().discriminator(),
            "foreground notification surfaced"
        );
        Ok(Surfaced::Toast { id: toast.id })
    }
}
