//! In-process walk through the whole notification flow against the loopback provider

use super::handlers::load_config;
use anyhow::{Context, Result};
use clap::Args;
use pushrelay_core::composer::Composer;
use pushrelay_core::models::{Action, Configuration};
use pushrelay_core::providers::LoopbackProvider;
use pushrelay_core::registry::TargetRegistry;
use pushrelay_core::relay::DispatchRelay;
use pushrelay_core::surface::{
    ActivationOutcome, DeliveredNotification, Device, Effect, InstanceId, RuntimeContext,
    SimulatedPlatform, Surfaced,
};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Route carried by the notification
    #[arg(long, default_value = "/random")]
    pub route: String,

    /// Deliver while the application is in the foreground
    #[arg(long)]
    pub foreground: bool,

    /// Pretend a running instance holds focus
    #[arg(long)]
    pub focused: bool,

    /// Path to configuration file (origin and handler path)
    #[arg(long)]
    pub config: Option<String>,
}

/// Handle the 'simulate' command
pub async fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let config = load_config(args.config.clone())?;
    let effects = run(&args, &config).await?;

    println!("✅ Simulation finished with {} effect(s)", effects.len());
    Ok(())
}

/// Run the flow and return the effects performed on the simulated device.
pub async fn run(args: &SimulateArgs, config: &Configuration) -> Result<Vec<Effect>> {
    let origin = config
        .origin_url()
        .with_context(|| format!("Invalid origin '{}'", config.origin))?;
    let context = if args.foreground {
        RuntimeContext::Foreground
    } else {
        RuntimeContext::Background
    };

    let provider = LoopbackProvider::new();
    let platform = SimulatedPlatform::granted();
    if args.focused {
        platform.set_focused(Some(InstanceId::new())).await;
    }
    let registry = TargetRegistry::new(Arc::new(platform.clone()), Arc::new(provider.clone()));
    let relay = DispatchRelay::new(Arc::new(provider.clone()));
    let device = Device::load(
        Arc::new(platform.clone()),
        origin,
        &config.background_handler_path,
        context,
    )
    .await;

    let target = registry.register().await?;
    println!("📱 Registered target {}", target.redacted_id());

    let intent = Composer::from_config(config).compose(
        "Simulated notification",
        "",
        Action::Navigate {
            route: args.route.clone(),
        },
    );
    let result = relay.dispatch(&target.id, &intent).await?;
    if !result.success {
        anyhow::bail!(
            "Dispatch failed [{}]: {}",
            result
                .error_kind
                .map(|k| k.to_string())
                .unwrap_or_default(),
            result.error_message.unwrap_or_default()
        );
    }
    println!(
        "📤 Dispatched via {}: {}",
        relay.provider(),
        result.provider_message_id.unwrap_or_default()
    );

    for message in provider.take_delivered(&target.id) {
        match device.deliver(DeliveredNotification::from(message)).await? {
            Surfaced::Toast { id } => {
                println!("💬 Foreground toast shown, activating");
                device.foreground().activate(id).await?;
            }
            Surfaced::System { tag } => {
                println!("🔔 System notification shown (tag {}), clicking it", tag);
                let event = platform
                    .click(&tag, None)
                    .await
                    .context("notification disappeared before activation")?;
                if let ActivationOutcome::Performed(Effect::PostMessage { action, .. }) =
                    device.background().on_activation(event).await?
                {
                    println!("📨 Relayed to focused instance");
                    device.receive_message(&action).await?;
                }
            }
        }
    }

    let effects = platform.effects().await;
    for effect in &effects {
        println!("   ➜ {}", describe(effect));
    }
    Ok(effects)
}

fn describe(effect: &Effect) -> String {
    match effect {
        Effect::OpenWindow { url } => format!("open new instance at {}", url),
        Effect::Navigate { url } => format!("navigate current instance to {}", url),
        Effect::Reload => "reload current instance".to_string(),
        Effect::Custom { fields } => format!("custom action {:?}", fields),
        Effect::PostMessage { instance, action } => {
            format!("post {} to instance {}", action.discriminator(), instance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn args(foreground: bool, focused: bool) -> SimulateArgs {
        SimulateArgs {
            route: "/random".to_string(),
            foreground,
            focused,
            config: None,
        }
    }

    #[tokio::test]
    async fn test_background_without_focus_opens_route() {
        let effects = run(&args(false, false), &Configuration::default())
            .await
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::OpenWindow {
                url: Url::parse("http://localhost:3000/random").unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_background_with_focus_relays_message() {
        let effects = run(&args(false, true), &Configuration::default())
            .await
            .unwrap();
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], Effect::PostMessage { .. }));
        assert_eq!(
            effects[1],
            Effect::Navigate {
                url: Url::parse("http://localhost:3000/random").unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_foreground_navigates_on_activation() {
        let effects = run(&args(true, false), &Configuration::default())
            .await
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::Navigate {
                url: Url::parse("http://localhost:3000/random").unwrap()
            }]
        );
    }
}
