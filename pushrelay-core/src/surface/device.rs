//! Receiving device: owns both surfaces and routes deliveries by runtime context

use super::background::BackgroundSurface;
use super::foreground::ForegroundSurface;
use super::platform::{Effect, Platform, SurfaceError};
use super::{DeliveredNotification, DeliverySurface, RuntimeContext, Surfaced};
use crate::models::Action;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

pub struct Device {
    foreground: ForegroundSurface,
    background: BackgroundSurface,
    in_foreground: AtomicBool,
    handler_registered: bool,
}

impl Device {
    /// Set up both surfaces and register the background handler at `handler_path`.
    ///
    /// Registration failure is logged and leaves the device usable for foreground delivery.
    pub async fn load(
        platform: Arc<dyn Platform>,
        origin: Url,
        handler_path: &str,
        context: RuntimeContext,
    ) -> Self {
        let handler_registered = match platform.register_background_handler(handler_path).await {
            Ok(()) => {
                tracing::info!(path = handler_path, "background handler registered");
                true
            }
            Err(e) => {
                tracing::error!(path = handler_path, error = %e, "background handler registration failed");
                false
            }
        };

        Self {
            foreground: ForegroundSurface::new(platform.clone(), origin.clone()),
            background: BackgroundSurface::new(platform, origin),
            in_foreground: AtomicBool::new(context == RuntimeContext::Foreground),
            handler_registered,
        }
    }

    pub fn handler_registered(&self) -> bool {
        self.handler_registered
    }

    pub fn context(&self) -> RuntimeContext {
        if self.in_foreground.load(Ordering::SeqCst) {
            RuntimeContext::Foreground
        } else {
            RuntimeContext::Background
        }
    }

    pub fn set_context(&self, context: RuntimeContext) {
        self.in_foreground
            .store(context == RuntimeContext::Foreground, Ordering::SeqCst);
    }

    /// The one surface eligible in `context`
    pub fn surface(&self, context: RuntimeContext) -> &dyn DeliverySurface {
        match context {
            RuntimeContext::Foreground => &self.foreground,
            RuntimeContext::Background => &self.background,
        }
    }

    /// Route a delivery to exactly one surface, chosen from the context at this moment.
    pub async fn deliver(
        &self,
        notification: DeliveredNotification,
    ) -> Result<Surfaced, SurfaceError> {
        let context = self.context();
        tracing::debug!(?context, "routing delivered notification");
        self.surface(context).deliver(notification).await
    }

    pub fn foreground(&self) -> &ForegroundSurface {
        &self.foreground
    }

    pub fn background(&self) -> &BackgroundSurface {
        &self.background
    }

    /// A running instance received an action posted by the background handler.
    pub async fn receive_message(&self, action: &Action) -> Result<Option<Effect>, SurfaceError> {
        self.foreground.handle_relayed(action).await
    }
}
