//! Notification intent: what one dispatch call sends

use crate::models::action::{Action, DataMap};
use serde::Serialize;

/// Data key for the visible-notification dedup tag.
pub const TAG_KEY: &str = "tag";

/// Immutable notification built by the [`Composer`](crate::composer::Composer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    title: String,
    body: String,
    action: Action,
    extra: DataMap,
}

impl NotificationIntent {
    /// `extra` must already carry the encoded `action`.
    pub(crate) fn new(title: String, body: String, action: Action, extra: DataMap) -> Self {
        Self {
            title,
            body,
            action,
            extra,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Flat wire data: the encoded action plus tag and caller extras.
    pub fn extra(&self) -> &DataMap {
        &self.extra
    }

    pub fn tag(&self) -> Option<&str> {
        self.extra.get(TAG_KEY).map(String::as_str)
    }

    /// Bytes the message occupies against the provider limit: title, body and the flat data
    /// (keys plus values).
    pub fn payload_size(&self) -> usize {
        let data: usize = self.extra.iter().map(|(k, v)| k.len() + v.len()).sum();
        self.title.len() + self.body.len() + data
    }
}
