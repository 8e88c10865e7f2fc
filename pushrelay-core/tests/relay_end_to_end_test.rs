use pushrelay_core::composer::Composer;
use pushrelay_core::error::{ErrorKind, RelayError};
use pushrelay_core::models::{Action, DataMap};
use pushrelay_core::providers::{LoopbackProvider, ProviderCall};
use pushrelay_core::registry::{PermissionState, TargetRegistry};
use pushrelay_core::relay::DispatchRelay;
use pushrelay_core::surface::{
    ActivationOutcome, DeliveredNotification, Device, Effect, RuntimeContext, SimulatedPlatform,
};
use std::sync::Arc;
use url::Url;

const ORIGIN: &str = "http://localhost:3000";

struct Harness {
    provider: LoopbackProvider,
    platform: SimulatedPlatform,
    registry: TargetRegistry,
    relay: DispatchRelay,
    device: Device,
}

async fn harness(context: RuntimeContext) -> Harness {
    let provider = LoopbackProvider::new();
    let platform = SimulatedPlatform::granted();
    let registry = TargetRegistry::new(Arc::new(platform.clone()), Arc::new(provider.clone()));
    let relay = DispatchRelay::new(Arc::new(provider.clone()));
    let device = Device::load(
        Arc::new(platform.clone()),
        Url::parse(ORIGIN).unwrap(),
        "/firebase-messaging-sw.js",
        context,
    )
    .await;

    Harness {
        provider,
        platform,
        registry,
        relay,
        device,
    }
}

/// Hand everything the provider delivered to `token` to the device.
async fn pump(h: &Harness, token: &str) {
    for message in h.provider.take_delivered(token) {
        h.device
            .deliver(DeliveredNotification::from(message))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn navigate_in_background_without_focus_opens_route() {
    let h = harness(RuntimeContext::Background).await;
    let target = h.registry.register().await.unwrap();

    let intent = Composer::default().compose(
        "Order shipped",
        "Tap to view",
        Action::Navigate {
            route: "/random".to_string(),
        },
    );
    let result = h.relay.dispatch(&target.id, &intent).await.unwrap();
    assert!(result.success);

    pump(&h, &target.id).await;
    let visible = h.platform.visible_notifications().await;
    assert_eq!(visible.len(), 1);
    assert!(h.platform.effects().await.is_empty());

    let event = h.platform.click(&visible[0].tag, None).await.unwrap();
    let outcome = h.device.background().on_activation(event).await.unwrap();

    let expected = Effect::OpenWindow {
        url: Url::parse("http://localhost:3000/random").unwrap(),
    };
    assert_eq!(outcome, ActivationOutcome::Performed(expected.clone()));
    assert_eq!(h.platform.effects().await, vec![expected]);
    assert!(h.platform.visible_notifications().await.is_empty());
}

#[tokio::test]
async fn empty_token_never_reaches_provider() {
    let h = harness(RuntimeContext::Background).await;
    let intent = Composer::default().compose("", "", Action::Refresh);

    let result = h.relay.dispatch("", &intent).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::MissingTarget));
    assert!(h.provider.calls().await.is_empty());
}

#[tokio::test]
async fn register_twice_returns_same_target() {
    let h = harness(RuntimeContext::Foreground).await;
    let first = h.registry.register().await.unwrap();
    let second = h.registry.register().await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.provider.calls().await, vec![ProviderCall::RequestToken]);
}

#[tokio::test]
async fn denied_consent_fails_without_provider_call() {
    let provider = LoopbackProvider::new();
    let platform = SimulatedPlatform::new(PermissionState::Prompt, PermissionState::Denied);
    let registry = TargetRegistry::new(Arc::new(platform.clone()), Arc::new(provider.clone()));

    let err = registry.register().await.unwrap_err();

    assert!(matches!(err, RelayError::PermissionDenied));
    assert_eq!(platform.prompt_count(), 1);
    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn revoked_target_is_rejected() {
    let h = harness(RuntimeContext::Background).await;
    let target = h.registry.register().await.unwrap();
    h.registry.revoke(&target).await.unwrap();
    assert!(h.registry.current().await.is_none());

    let intent = Composer::default().compose("Hi", "", Action::Refresh);
    let result = h.relay.dispatch(&target.id, &intent).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::InvalidTarget));
    assert!(h.provider.take_delivered(&target.id).is_empty());
}

#[tokio::test]
async fn same_tag_leaves_one_visible_notification() {
    let h = harness(RuntimeContext::Background).await;
    let target = h.registry.register().await.unwrap();
    let composer = Composer::default();

    for title in ["First", "Second"] {
        let intent = composer.compose_with(
            title,
            "",
            Action::Refresh,
            Some("order-42"),
            DataMap::new(),
        );
        assert!(h.relay.dispatch(&target.id, &intent).await.unwrap().success);
    }
    pump(&h, &target.id).await;

    let visible = h.platform.visible_notifications().await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].tag, "order-42");
    assert_eq!(visible[0].title, "Second");
}

#[tokio::test]
async fn custom_action_survives_the_wire() {
    let h = harness(RuntimeContext::Foreground).await;
    let target = h.registry.register().await.unwrap();

    let mut fields = DataMap::new();
    fields.insert("action".to_string(), "spoof".to_string());
    fields.insert("orderId".to_string(), "42".to_string());
    fields.insert("custom.nested".to_string(), "x".to_string());
    let action = Action::Custom { fields };

    let intent = Composer::default().compose("T", "B", action.clone());
    h.relay.dispatch(&target.id, &intent).await.unwrap();

    let delivered = h.provider.take_delivered(&target.id);
    assert_eq!(delivered.len(), 1);
    assert_eq!(Action::decode(&delivered[0].data), action);
}

#[tokio::test]
async fn foreground_delivery_waits_for_activation() {
    let h = harness(RuntimeContext::Foreground).await;
    let target = h.registry.register().await.unwrap();
    let intent = Composer::default().compose(
        "T",
        "B",
        Action::OpenUrl {
            url: "https://example.com/docs".to_string(),
        },
    );
    h.relay.dispatch(&target.id, &intent).await.unwrap();
    pump(&h, &target.id).await;

    let toasts = h.platform.toasts().await;
    assert_eq!(toasts.len(), 1);
    assert!(h.platform.visible_notifications().await.is_empty());
    assert!(h.platform.effects().await.is_empty());

    let effect = h.device.foreground().activate(toasts[0].id).await.unwrap();
    assert_eq!(
        effect,
        Some(Effect::OpenWindow {
            url: Url::parse("https://example.com/docs").unwrap()
        })
    );
}

#[tokio::test]
async fn unknown_action_in_background_opens_origin() {
    let h = harness(RuntimeContext::Background).await;
    let mut data = DataMap::new();
    data.insert("action".to_string(), "teleport".to_string());
    h.device
        .deliver(DeliveredNotification {
            title: None,
            body: None,
            data,
        })
        .await
        .unwrap();

    let visible = h.platform.visible_notifications().await;
    assert_eq!(visible[0].title, "New Message");
    let event = h.platform.click("default", Some("open")).await.unwrap();
    let outcome = h.device.background().on_activation(event).await.unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Performed(Effect::OpenWindow {
            url: Url::parse("http://localhost:3000/").unwrap()
        })
    );
}

#[tokio::test]
async fn provider_outage_is_reported_as_unavailable() {
    let h = harness(RuntimeContext::Background).await;
    let target = h.registry.register().await.unwrap();
    h.provider.set_reachable(false);

    let intent = Composer::default().compose("T", "B", Action::None);
    let result = h.relay.dispatch(&target.id, &intent).await.unwrap();

    assert_eq!(result.error_kind, Some(ErrorKind::ProviderUnavailable));
    assert!(result.error_kind.unwrap().is_retryable());
}
