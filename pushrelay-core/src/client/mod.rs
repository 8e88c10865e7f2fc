//! Client for a running pushrelay server

use crate::models::{ErrorResponse, HealthResponse, NotificationRequest, SendResponse};
use anyhow::{Context, Result};
use reqwest::Client;

/// Result of `POST /notification` as seen by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(SendResponse),
    /// Non-2xx status with the server's error body
    Rejected { status: u16, error: ErrorResponse },
}

pub struct NotificationClient {
    base_url: String,
    client: Client,
}

impl NotificationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = base.trim_end_matches('/').to_string();
        Self {
            base_url: base,
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Trigger one notification. Transport failures are `Err`; server rejections are
    /// returned as [`SendOutcome::Rejected`].
    pub async fn send(&self, request: &NotificationRequest) -> Result<SendOutcome> {
        let response = self
            .client
            .post(self.endpoint("notification"))
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = response.status();
        if status.is_success() {
            let sent = response
                .json::<SendResponse>()
                .await
                .context("Failed to parse send response")?;
            return Ok(SendOutcome::Sent(sent));
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorResponse>(&body).unwrap_or(ErrorResponse {
            error: body.trim().to_string(),
            kind: None,
        });
        Ok(SendOutcome::Rejected {
            status: status.as_u16(),
            error,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(self.endpoint("api/v1/health"))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Server error {}: {}", status, body.trim()));
        }

        response
            .json::<HealthResponse>()
            .await
            .context("Failed to parse health response")
    }
}
