//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Environment variable overriding `fcm_project_id`.
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";

/// Errors loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Which provider transport the server forwards to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Firebase Cloud Messaging HTTP v1
    #[default]
    Fcm,
    /// In-process provider, for demos and tests
    Loopback,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Fcm => "fcm",
            ProviderKind::Loopback => "loopback",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fcm" => Ok(ProviderKind::Fcm),
            "loopback" => Ok(ProviderKind::Loopback),
            other => Err(format!("unknown provider '{}' (expected fcm or loopback)", other)),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// Server bind address
    pub server_host: String,
    /// Server port number
    pub server_port: u16,
    /// Provider transport
    pub provider: ProviderKind,
    /// FCM project id (overridden by FIREBASE_PROJECT_ID)
    pub fcm_project_id: Option<String>,
    /// Origin of the receiving application, used to resolve relative locations
    pub origin: String,
    /// Well-known path the background handler registers at
    pub background_handler_path: String,
    /// Title used when a request leaves it empty
    pub default_title: String,
    /// Body used when a request leaves it empty
    pub default_body: String,
    /// Maximum accepted request body in bytes
    pub max_request_bytes: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            provider: ProviderKind::Fcm,
            fcm_project_id: None,
            origin: "http://localhost:3000".to_string(),
            background_handler_path: "/firebase-messaging-sw.js".to_string(),
            default_title: crate::composer::DEFAULT_TITLE.to_string(),
            default_body: crate::composer::DEFAULT_BODY.to_string(),
            max_request_bytes: 16384, // 16KB
        }
    }
}

impl Configuration {
    /// Load configuration from file, falling back to defaults if it does not exist
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("pushrelay").join("config.toml"))
    }

    /// Overlay values supplied through the environment.
    pub fn apply_env(&mut self) {
        if let Ok(project_id) = std::env::var(PROJECT_ID_ENV) {
            if !project_id.trim().is_empty() {
                self.fcm_project_id = Some(project_id.trim().to_string());
            }
        }
    }

    /// Parsed origin. Call after `validate`.
    pub fn origin_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.origin)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Validate port (u16 is already 0-65535, so only check minimum)
        if self.server_port < 1024 {
            errors.push(
                "server_port must be at least 1024 (privileged ports not allowed)".to_string(),
            );
        }

        match Url::parse(&self.origin) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => errors.push("origin must use http or https".to_string()),
            Err(e) => errors.push(format!("origin is not a valid URL: {}", e)),
        }

        if !self.background_handler_path.starts_with('/') {
            errors.push("background_handler_path must start with '/'".to_string());
        }

        if self.max_request_bytes == 0 || self.max_request_bytes > 65536 {
            errors.push("max_request_bytes must be between 1 and 65536".to_string());
        }

        if self.provider == ProviderKind::Fcm
            && self
                .fcm_project_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty())
        {
            errors.push(format!(
                "fcm_project_id is required for the fcm provider (or set {})",
                PROJECT_ID_ENV
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
