//! Notification actions and their flat wire representation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat string map carried as provider data.
pub type DataMap = BTreeMap<String, String>;

/// Discriminator key naming the action variant.
pub const ACTION_KEY: &str = "action";
pub const URL_KEY: &str = "url";
pub const ROUTE_KEY: &str = "route";
/// Prefix for the fields of a custom action.
pub const CUSTOM_PREFIX: &str = "custom.";

/// Effect a delivered notification asks the receiving device to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    OpenUrl {
        url: String,
    },
    Navigate {
        route: String,
    },
    Refresh,
    Custom {
        #[serde(default)]
        fields: DataMap,
    },
    #[default]
    None,
}

impl Action {
    pub fn discriminator(&self) -> &'static str {
        match self {
            Action::OpenUrl { .. } => "open_url",
            Action::Navigate { .. } => "navigate",
            Action::Refresh => "refresh",
            Action::Custom { .. } => "custom",
            Action::None => "none",
        }
    }

    /// Keys owned by the action encoding. Other data must not use them.
    pub fn is_reserved_key(key: &str) -> bool {
        key == ACTION_KEY || key == URL_KEY || key == ROUTE_KEY || key.starts_with(CUSTOM_PREFIX)
    }

    /// Flatten into a fresh data map.
    pub fn encode(&self) -> DataMap {
        let mut data = DataMap::new();
        self.write_into(&mut data);
        data
    }

    /// Write the discriminator and variant fields into `data`.
    pub fn write_into(&self, data: &mut DataMap) {
        data.insert(ACTION_KEY.to_string(), self.discriminator().to_string());
        match self {
            Action::OpenUrl { url } => {
                data.insert(URL_KEY.to_string(), url.clone());
            }
            Action::Navigate { route } => {
                data.insert(ROUTE_KEY.to_string(), route.clone());
            }
            Action::Custom { fields } => {
                for (key, value) in fields {
                    data.insert(format!("{}{}", CUSTOM_PREFIX, key), value.clone());
                }
            }
            Action::Refresh | Action::None => {}
        }
    }

    /// Decode from delivered data. Missing or unknown discriminators, and variants
    /// missing their required field, decode to `None`.
    pub fn decode(data: &DataMap) -> Action {
        let Some(discriminator) = data.get(ACTION_KEY) else {
            return Action::None;
        };

        match discriminator.as_str() {
            "open_url" => data
                .get(URL_KEY)
                .map(|url| Action::OpenUrl { url: url.clone() })
                .unwrap_or_default(),
            "navigate" => data
                .get(ROUTE_KEY)
                .map(|route| Action::Navigate {
                    route: route.clone(),
                })
                .unwrap_or_default(),
            "refresh" => Action::Refresh,
            "custom" => Action::Custom {
                fields: data
                    .iter()
                    .filter_map(|(key, value)| {
                        key.strip_prefix(CUSTOM_PREFIX)
                            .map(|field| (field.to_string(), value.clone()))
                    })
                    .collect(),
            },
            _ => Action::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(action: Action) {
        assert_eq!(Action::decode(&action.encode()), action);
    }

    #[test]
    fn test_every_variant_roundtrips() {
        roundtrip(Action::OpenUrl {
            url: "https://x".to_string(),
        });
        roundtrip(Action::Navigate {
            route: "/random".to_string(),
        });
        roundtrip(Action::Navigate {
            route: String::new(),
        });
        roundtrip(Action::Refresh);
        roundtrip(Action::None);
        roundtrip(Action::Custom {
            fields: DataMap::new(),
        });

        let mut fields = DataMap::new();
        fields.insert("action".to_string(), "shadowed?".to_string());
        fields.insert("url".to_string(), "not-an-open-url".to_string());
        fields.insert("custom.nested".to_string(), "v".to_string());
        fields.insert(String::new(), "empty key".to_string());
        roundtrip(Action::Custom { fields });
    }

    #[test]
    fn test_unknown_or_missing_discriminator_decodes_to_none() {
        let mut data = DataMap::new();
        assert_eq!(Action::decode(&data), Action::None);

        data.insert(ACTION_KEY.to_string(), "teleport".to_string());
        data.insert(URL_KEY.to_string(), "https://x".to_string());
        assert_eq!(Action::decode(&data), Action::None);
    }

    #[test]
    fn test_variant_without_field_decodes_to_none() {
        let mut data = DataMap::new();
        data.insert(ACTION_KEY.to_string(), "open_url".to_string());
        assert_eq!(Action::decode(&data), Action::None);
    }

    #[test]
    fn test_encoding_shape() {
        let data = Action::OpenUrl {
            url: "https://x".to_string(),
        }
        .encode();
        assert_eq!(data.get("action").map(String::as_str), Some("open_url"));
        assert_eq!(data.get("url").map(String::as_str), Some("https://x"));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_json_selector_shape() {
        let action: Action =
            serde_json::from_str(r#"{"type":"navigate","route":"/random"}"#).unwrap();
        assert_eq!(
            action,
            Action::Navigate {
                route: "/random".to_string()
            }
        );
        let refresh: Action = serde_json::from_str(r#"{"type":"refresh"}"#).unwrap();
        assert_eq!(refresh, Action::Refresh);
        let custom: Action = serde_json::from_str(r#"{"type":"custom"}"#).unwrap();
        assert_eq!(
            custom,
            Action::Custom {
                fields: DataMap::new()
            }
        );
    }

    #[test]
    fn test_reserved_keys() {
        assert!(Action::is_reserved_key("action"));
        assert!(Action::is_reserved_key("route"));
        assert!(Action::is_reserved_key("custom.anything"));
        assert!(!Action::is_reserved_key("tag"));
        assert!(!Action::is_reserved_key("timestamp"));
    }
}
