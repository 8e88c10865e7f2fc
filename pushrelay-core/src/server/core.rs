//! Relay server: builds the provider transport once and serves the HTTP API

use crate::composer::Composer;
use crate::models::{Configuration, ProviderKind};
use crate::providers::{FcmTransport, LoopbackProvider, PushTransport};
use crate::relay::DispatchRelay;
use crate::server::api::{create_api_routes, AppState};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

pub struct RelayServer {
    config: Configuration,
}

impl RelayServer {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    /// Build the shared state. An authentication failure does not abort startup: the
    /// server comes up and rejects every send with 500.
    pub async fn build_state(&self) -> AppState {
        let composer = Composer::from_config(&self.config);

        if self.config.provider == ProviderKind::Loopback {
            let provider = LoopbackProvider::new();
            tracing::info!(
                provider = "loopback",
                "provider transport ready, token routes under /api/v1/loopback"
            );
            return AppState::ready(DispatchRelay::new(Arc::new(provider.clone())), composer)
                .with_loopback(provider);
        }

        match self.build_fcm_transport().await {
            Ok(transport) => {
                tracing::info!(provider = transport.name(), "provider transport ready");
                AppState::ready(DispatchRelay::new(transport), composer)
            }
            Err(e) => {
                tracing::error!(
                    provider = self.config.provider.as_str(),
                    error = %e,
                    "provider transport failed to authenticate"
                );
                AppState::unavailable(self.config.provider.as_str(), e.to_string(), composer)
            }
        }
    }

    async fn build_fcm_transport(&self) -> Result<Arc<dyn PushTransport>> {
        let project_id = self
            .config
            .fcm_project_id
            .as_deref()
            .context("fcm_project_id is not configured")?;
        let transport = FcmTransport::authenticate(project_id)
            .await
            .context("FCM authentication failed")?;
        Ok(Arc::new(transport))
    }

    /// Serve until Ctrl+C.
    pub async fn start(self) -> Result<()> {
        let address: SocketAddr = format!("{}:{}", self.config.server_host, self.config.server_port)
            .parse()
            .context("Invalid server address")?;

        let state = Arc::new(self.build_state().await);
        let routes = create_api_routes(state, self.config.max_request_bytes)
            .with(warp::trace::request());

        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(address, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                }
            })
            .with_context(|| format!("Failed to bind to {}", address))?;

        tracing::info!(address = %bound, "pushrelay server listening");
        server.await;
        tracing::info!("pushrelay server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_state_is_ready() {
        let config = Configuration {
            provider: ProviderKind::Loopback,
            ..Configuration::default()
        };
        let state = RelayServer::new(config).build_state().await;
        assert!(state.transport_ready());
        assert!(state.serves_loopback_tokens());
    }

    #[tokio::test]
    async fn test_missing_project_id_leaves_transport_down() {
        let config = Configuration {
            provider: ProviderKind::Fcm,
            fcm_project_id: None,
            ..Configuration::default()
        };
        let state = RelayServer::new(config).build_state().await;
        assert!(!state.transport_ready());
    }
}
