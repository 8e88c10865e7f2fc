mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::handlers::{self, SendArgs};
use cli::simulate::{self, SimulateArgs};
use pushrelay_core::models::ProviderKind;

#[derive(Parser)]
#[command(name = "pushrelay")]
#[command(version)]
#[command(about = "Vendor-neutral push notification relay")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server exposing POST /notification
    ///
    /// The provider transport is authenticated once at startup. If that fails the server
    /// still starts and answers every send with 500. With the loopback provider, device
    /// tokens are issued by POST /api/v1/loopback/tokens.
    ///
    /// Examples:
    ///   pushrelay serve
    ///   pushrelay serve --provider loopback --port 9090
    Serve {
        /// Server bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Server port number (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<String>,

        /// Provider transport: fcm or loopback (overrides config)
        #[arg(long)]
        provider: Option<ProviderKind>,
    },

    /// Trigger a notification through a running server
    ///
    /// At most one of --url, --route, --refresh, --custom selects the action.
    ///
    /// Examples:
    ///   pushrelay send --token <T> --title "Hi" --route /inbox
    ///   pushrelay send --token <T> --custom orderId=42 --custom kind=shipped --tag order-42
    Send(SendArgs),

    /// Run register, dispatch, delivery and activation in-process and print each step
    Simulate(SimulateArgs),

    /// Write a default configuration file
    Config {
        /// Create the configuration file
        #[arg(long)]
        init: bool,

        /// Path to configuration file (default: platform config dir)
        #[arg(long)]
        config_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            config,
            provider,
        } => {
            handlers::handle_serve(host, port, config, provider).await?;
        }
        Commands::Send(args) => {
            handlers::handle_send(args).await?;
        }
        Commands::Simulate(args) => {
            simulate::handle_simulate(args).await?;
        }
        Commands::Config { init, config_file } => {
            if init {
                handlers::handle_config_init(config_file)?;
            } else {
                println!("Config command requires --init flag");
                println!("Usage: pushrelay config --init [--config-file PATH]");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "pushrelay",
            "serve",
            "--provider",
            "loopback",
            "--port",
            "9090",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve { port, provider, .. } => {
                assert_eq!(port, Some(9090));
                assert_eq!(provider, Some(ProviderKind::Loopback));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_send_with_custom_fields() {
        let cli = Cli::try_parse_from([
            "pushrelay",
            "send",
            "--token",
            "abc",
            "--custom",
            "orderId=42",
            "--custom",
            "kind=shipped",
        ])
        .unwrap();

        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.token, "abc");
                assert_eq!(args.custom.len(), 2);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_send_actions_conflict() {
        let result = Cli::try_parse_from([
            "pushrelay",
            "send",
            "--token",
            "abc",
            "--url",
            "https://example.com",
            "--route",
            "/x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result = Cli::try_parse_from(["pushrelay", "serve", "--provider", "apns"]);
        assert!(result.is_err());
    }
}
