//! In-memory platform used by the `simulate` command and tests.

use super::background::ActivationEvent;
use super::platform::{Effect, InstanceId, Platform, SurfaceError, SystemNotification, Toast};
use crate::registry::{ConsentGate, PermissionState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

struct SimulatedState {
    permission: Mutex<PermissionState>,
    /// Decision returned when the user is prompted
    prompt_answer: PermissionState,
    prompts: AtomicUsize,
    fail_registration: AtomicBool,
    registered_path: RwLock<Option<String>>,
    focused: RwLock<Option<InstanceId>>,
    toasts: RwLock<Vec<Toast>>,
    notifications: RwLock<Vec<SystemNotification>>,
    effects: RwLock<Vec<Effect>>,
}

/// Records everything the surfaces ask of the platform.
#[derive(Clone)]
pub struct SimulatedPlatform {
    state: Arc<SimulatedState>,
}

impl SimulatedPlatform {
    pub fn new(permission: PermissionState, prompt_answer: PermissionState) -> Self {
        Self {
            state: Arc::new(SimulatedState {
                permission: Mutex::new(permission),
                prompt_answer,
                prompts: AtomicUsize::new(0),
                fail_registration: AtomicBool::new(false),
                registered_path: RwLock::new(None),
                focused: RwLock::new(None),
                toasts: RwLock::new(Vec::new()),
                notifications: RwLock::new(Vec::new()),
                effects: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Platform where consent was already granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, PermissionState::Granted)
    }

    /// Make background handler registration fail from now on.
    pub fn fail_registration(&self) {
        self.state.fail_registration.store(true, Ordering::SeqCst);
    }

    pub async fn set_focused(&self, instance: Option<InstanceId>) {
        *self.state.focused.write().await = instance;
    }

    /// Visible system notifications, at most one per tag
    pub async fn visible_notifications(&self) -> Vec<SystemNotification> {
        self.state.notifications.read().await.clone()
    }

    pub async fn toasts(&self) -> Vec<Toast> {
        self.state.toasts.read().await.clone()
    }

    /// Effects performed so far, in order
    pub async fn effects(&self) -> Vec<Effect> {
        self.state.effects.read().await.clone()
    }

    pub async fn registered_path(&self) -> Option<String> {
        self.state.registered_path.read().await.clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.state.prompts.load(Ordering::SeqCst)
    }

    /// User clicks the visible notification `tag`, optionally on a sub-action.
    pub async fn click(&self, tag: &str, sub_action: Option<&str>) -> Option<ActivationEvent> {
        let notifications = self.state.notifications.read().await;
        let shown = notifications.iter().find(|n| n.tag == tag)?;
        Some(ActivationEvent {
            tag: shown.tag.clone(),
            action: sub_action.map(str::to_string),
            data: shown.data.clone(),
        })
    }

    fn permission(&self) -> PermissionState {
        *self
            .state
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Platform for SimulatedPlatform {
    async fn register_background_handler(&self, path: &str) -> Result<(), SurfaceError> {
        if self.state.fail_registration.load(Ordering::SeqCst) {
            return Err(SurfaceError::Registration(format!(
                "cannot register handler at {}",
                path
            )));
        }
        *self.state.registered_path.write().await = Some(path.to_string());
        Ok(())
    }

    async fn show_toast(&self, toast: &Toast) -> Result<(), SurfaceError> {
        self.state.toasts.write().await.push(toast.clone());
        Ok(())
    }

    async fn show_notification(
        &self,
        notification: &SystemNotification,
    ) -> Result<(), SurfaceError> {
        let mut visible = self.state.notifications.write().await;
        visible.retain(|n| n.tag != notification.tag);
        visible.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, tag: &str) {
        self.state
            .notifications
            .write()
            .await
            .retain(|n| n.tag != tag);
    }

    async fn focused_instance(&self) -> Option<InstanceId> {
        *self.state.focused.read().await
    }

    async fn perform(&self, effect: &Effect) -> Result<(), SurfaceError> {
        self.state.effects.write().await.push(effect.clone());
        Ok(())
    }
}

#[async_trait]
impl ConsentGate for SimulatedPlatform {
    fn state(&self) -> PermissionState {
        self.permission()
    }

    async fn prompt(&self) -> PermissionState {
        self.state.prompts.fetch_add(1, Ordering::SeqCst);
        let answer = self.state.prompt_answer;
        *self
            .state
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = answer;
        answer
    }
}
