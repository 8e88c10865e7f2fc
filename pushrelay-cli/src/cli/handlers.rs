use anyhow::{Context, Result};
use clap::Args;
use pushrelay_core::client::{NotificationClient, SendOutcome};
use pushrelay_core::models::{Action, Configuration, DataMap, NotificationRequest, ProviderKind};
use pushrelay_core::server::RelayServer;
use pushrelay_core::services::logging::init_logging;
use std::path::PathBuf;

/// Environment variable naming the server `send` talks to
pub const SERVER_ENV: &str = "PUSHRELAY_SERVER";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Delivery target token of the device
    #[arg(long)]
    pub token: String,

    /// Notification title (server default when omitted)
    #[arg(long)]
    pub title: Option<String>,

    /// Notification body (server default when omitted)
    #[arg(long)]
    pub body: Option<String>,

    /// Open this URL on activation
    #[arg(long, conflicts_with_all = ["route", "refresh", "custom"])]
    pub url: Option<String>,

    /// Navigate to this in-app route on activation
    #[arg(long, conflicts_with_all = ["refresh", "custom"])]
    pub route: Option<String>,

    /// Reload the application on activation
    #[arg(long, conflicts_with = "custom")]
    pub refresh: bool,

    /// Custom action field as key=value (repeatable)
    #[arg(long, value_parser = parse_key_value)]
    pub custom: Vec<(String, String)>,

    /// Tag; a later notification with the same tag replaces this one
    #[arg(long)]
    pub tag: Option<String>,

    /// Server URL (default: $PUSHRELAY_SERVER or http://127.0.0.1:8080)
    #[arg(long)]
    pub server: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl SendArgs {
    /// Action selected by the flags, `None` when no action flag was given.
    pub fn action(&self) -> Option<Action> {
        if let Some(url) = &self.url {
            return Some(Action::OpenUrl { url: url.clone() });
        }
        if let Some(route) = &self.route {
            return Some(Action::Navigate {
                route: route.clone(),
            });
        }
        if self.refresh {
            return Some(Action::Refresh);
        }
        if !self.custom.is_empty() {
            let fields: DataMap = self.custom.iter().cloned().collect();
            return Some(Action::Custom { fields });
        }
        None
    }

    pub fn to_request(&self) -> NotificationRequest {
        NotificationRequest {
            token: Some(self.token.clone()),
            title: self.title.clone(),
            body: self.body.clone(),
            tag: self.tag.clone(),
            url: None,
            action: self.action(),
        }
    }
}

/// Parse `key=value`. The key must be non-empty; the value may contain '='.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

/// Server URL by precedence: flag, then environment, then default.
pub fn resolve_server_url(flag: Option<String>) -> String {
    flag.filter(|s| !s.trim().is_empty())
        .or_else(|| {
            std::env::var(SERVER_ENV)
                .ok()
                .filter(|s| !s.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

/// Expand a leading `~/`; `None` selects the platform default path.
pub fn resolve_config_path(config_file: Option<String>) -> Result<PathBuf> {
    match config_file {
        Some(path) if path.starts_with("~/") => {
            let home = std::env::var("HOME")
                .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
            Ok(PathBuf::from(path.replacen("~/", &format!("{}/", home), 1)))
        }
        Some(path) => Ok(PathBuf::from(path)),
        None => Configuration::default_config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get default config path: {}", e)),
    }
}

/// Load the configuration file (defaults when absent) and overlay the environment.
pub fn load_config(config_file: Option<String>) -> Result<Configuration> {
    let path = resolve_config_path(config_file)?;
    let mut config = Configuration::load_from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env();
    Ok(config)
}

fn start_logging(config: &Configuration) {
    if let Err(e) = init_logging(config.log_level) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }
}

/// Handle the 'serve' command
pub async fn handle_serve(
    host: Option<String>,
    port: Option<u16>,
    config_file: Option<String>,
    provider: Option<ProviderKind>,
) -> Result<()> {
    let mut config = load_config(config_file)?;
    if let Some(host) = host {
        config.server_host = host;
    }
    if let Some(port) = port {
        config.server_port = port;
    }
    if let Some(provider) = provider {
        config.provider = provider;
    }

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("❌ {}", error);
        }
        anyhow::bail!("Invalid configuration ({} problem(s))", errors.len());
    }

    start_logging(&config);
    println!(
        "🚀 pushrelay starting on {}:{} (provider: {})",
        config.server_host,
        config.server_port,
        config.provider.as_str()
    );
    println!("Press Ctrl+C to stop the server");

    RelayServer::new(config).start().await
}

/// Handle the 'send' command
pub async fn handle_send(args: SendArgs) -> Result<()> {
    let server = resolve_server_url(args.server.clone());
    let client = NotificationClient::new(&server);
    let request = args.to_request();

    match client.send(&request).await? {
        SendOutcome::Sent(sent) => {
            if args.json {
                println!("{}", serde_json::to_string(&sent)?);
            } else {
                println!("📤 Notification sent: {}", sent.message_id);
            }
            Ok(())
        }
        SendOutcome::Rejected { status, error } => {
            let kind = error
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "fault".to_string());
            if args.json {
                println!("{}", serde_json::to_string(&error)?);
            }
            anyhow::bail!("Dispatch failed [{}] ({}): {}", kind, status, error.error)
        }
    }
}

/// Handle the 'config' command
pub fn handle_config_init(config_file: Option<String>) -> Result<()> {
    println!("⚙️  Initializing pushrelay configuration");

    let config_path = resolve_config_path(config_file)?;
    println!("📄 Config file: {}", config_path.display());

    if config_path.exists() {
        println!("⚠️  Configuration file already exists, leaving it unchanged.");
        return Ok(());
    }

    Configuration::default()
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("✅ Configuration written with defaults.");
    println!("   Set fcm_project_id (or FIREBASE_PROJECT_ID) before serving with fcm.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> SendArgs {
        SendArgs {
            token: "abc".to_string(),
            title: None,
            body: None,
            url: None,
            route: None,
            refresh: false,
            custom: Vec::new(),
            tag: None,
            server: None,
            json: false,
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("a=b=c"),
            Ok(("a".to_string(), "b=c".to_string()))
        );
        assert_eq!(parse_key_value("k="), Ok(("k".to_string(), String::new())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=v").is_err());
    }

    #[test]
    fn test_action_from_flags() {
        assert_eq!(args().action(), None);

        let mut route = args();
        route.route = Some("/inbox".to_string());
        assert_eq!(
            route.action(),
            Some(Action::Navigate {
                route: "/inbox".to_string()
            })
        );

        let mut custom = args();
        custom.custom = vec![("orderId".to_string(), "42".to_string())];
        let Some(Action::Custom { fields }) = custom.action() else {
            panic!("expected custom action");
        };
        assert_eq!(fields.get("orderId").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_request_carries_tag() {
        let mut send = args();
        send.tag = Some("order-42".to_string());
        send.refresh = true;
        let request = send.to_request();
        assert_eq!(request.tag.as_deref(), Some("order-42"));
        assert_eq!(request.resolved_action(), Action::Refresh);
    }

    #[test]
    fn test_server_flag_wins() {
        assert_eq!(
            resolve_server_url(Some("http://relay:9000".to_string())),
            "http://relay:9000"
        );
    }

    #[test]
    fn test_config_init_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let path_arg = Some(path.to_string_lossy().to_string());

        handle_config_init(path_arg.clone()).unwrap();
        let written = Configuration::load_from_file(&path).unwrap();
        assert_eq!(written.server_port, Configuration::default().server_port);

        std::fs::write(&path, "server_port = 9999\n").unwrap();
        handle_config_init(path_arg).unwrap();
        let kept = Configuration::load_from_file(&path).unwrap();
        assert_eq!(kept.server_port, 9999);
    }
}
