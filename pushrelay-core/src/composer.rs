//! Notification composer: builds intents from caller-supplied fields

use crate::models::{Action, Configuration, DataMap, NotificationIntent, TAG_KEY};

pub const DEFAULT_TITLE: &str = "Test Notification";
pub const DEFAULT_BODY: &str = "This is a test notification";

/// Builds [`NotificationIntent`]s. Empty title or body fall back to the defaults.
#[derive(Debug, Clone)]
pub struct Composer {
    default_title: String,
    default_body: String,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_BODY)
    }
}

impl Composer {
    pub fn new(default_title: impl Into<String>, default_body: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
            default_body: default_body.into(),
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.default_title.clone(), config.default_body.clone())
    }

    pub fn compose(&self, title: &str, body: &str, action: Action) -> NotificationIntent {
        self.compose_with(title, body, action, None, DataMap::new())
    }

    /// Compose with an optional dedup tag and extra data pairs.
    ///
    /// Extras colliding with the action encoding are dropped so the action always
    /// decodes back to itself.
    pub fn compose_with(
        &self,
        title: &str,
        body: &str,
        action: Action,
        tag: Option<&str>,
        extra: DataMap,
    ) -> NotificationIntent {
        let mut data: DataMap = extra
            .into_iter()
            .filter(|(key, _)| !Action::is_reserved_key(key))
            .collect();

        if let Some(tag) = tag.map(str::trim).filter(|t| !t.is_empty()) {
            data.insert(TAG_KEY.to_string(), tag.to_string());
        }
        action.write_into(&mut data);

        NotificationIntent::new(
            or_default(title, &self.default_title),
            or_default(body, &self.default_body),
            action,
            data,
        )
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
