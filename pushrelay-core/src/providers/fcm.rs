//! Firebase Cloud Messaging provider: send messages via the HTTP v1 API.

use crate::models::TAG_KEY;
use crate::providers::{PushMessage, PushTransport, TransportError};
use super::oauth::{AccessTokenProvider, TokenGrant};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1/projects";

/// Project and access-token source used to authorize sends.
#[derive(Debug, Clone)]
pub struct FcmCredentials {
    project_id: String,
    tokens: Arc<AccessTokenProvider>,
}

impl FcmCredentials {
    /// Credentials with a fixed, pre-minted access token.
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_grant(project_id, TokenGrant::Static(access_token.into()))
    }

    pub fn with_grant(project_id: impl Into<String>, grant: TokenGrant) -> Self {
        Self {
            project_id: project_id.into(),
            tokens: Arc::new(AccessTokenProvider::new(grant)),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn tokens(&self) -> &AccessTokenProvider {
        &self.tokens
    }

    /// Credentials for `project_id` with the token grant picked from the environment
    /// (see [`TokenGrant::from_env`]).
    pub fn resolve(project_id: &str) -> Result<Self, TransportError> {
        if project_id.trim().is_empty() {
            return Err(TransportError::Unauthenticated(
                "FCM project id is not configured".to_string(),
            ));
        }
        Ok(Self::with_grant(project_id, TokenGrant::from_env()))
    }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Map an FCM error response onto a transport error.
pub(crate) fn classify_error(status: u16, body: &str) -> TransportError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error);
    let error_code = parsed
        .as_ref()
        .and_then(|e| e.details.iter().find_map(|d| d.error_code.clone()));
    let message = match parsed {
        Some(e) if !e.message.is_empty() => e.message,
        Some(e) => e.status,
        None => body.trim().to_string(),
    };
    let detail = format!("FCM error {}: {}", status, message);

    match (status, error_code.as_deref()) {
        (_, Some("UNREGISTERED")) | (_, Some("SENDER_ID_MISMATCH")) | (404, _) => {
            TransportError::Unregistered(detail)
        }
        (400, _) if message.contains("registration token") => {
            TransportError::Unregistered(detail)
        }
        (401, _) | (403, _) | (_, Some("THIRD_PARTY_AUTH_ERROR")) => {
            TransportError::Unauthenticated(detail)
        }
        (429, _) | (500..=599, _) | (_, Some("QUOTA_EXCEEDED")) | (_, Some("UNAVAILABLE")) => {
            TransportError::Unavailable(detail)
        }
        _ => TransportError::Rejected(detail),
    }
}

/// FCM HTTP v1 send transport. Constructed once at process start.
pub struct FcmTransport {
    credentials: FcmCredentials,
    base_url: String,
    client: Arc<Client>,
}

impl FcmTransport {
    pub fn new(credentials: FcmCredentials) -> Self {
        Self {
            credentials,
            base_url: FCM_API_BASE.to_string(),
            client: Arc::new(Client::new()),
        }
    }

    /// Point at a different API base (e.g. a local fake).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve credentials from the environment and build the transport. Fails when the
    /// service account cannot be authenticated.
    pub async fn authenticate(project_id: &str) -> Result<Self, TransportError> {
        Self::connect(FcmCredentials::resolve(project_id)?).await
    }

    /// Mint the first access token now so bad credentials fail at startup rather than on
    /// the first send.
    pub async fn connect(credentials: FcmCredentials) -> Result<Self, TransportError> {
        credentials.tokens().access_token().await?;
        tracing::info!(
            project_id = credentials.project_id(),
            "FCM transport authenticated"
        );
        Ok(Self::new(credentials))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/messages:send",
            self.base_url, self.credentials.project_id
        )
    }

    async fn post(&self, message: &PushMessage) -> Result<String, TransportError> {
        let access_token = self.credentials.tokens().access_token().await?;
        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(access_token)
            .json(&Self::request_body(message))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        let parsed: SendResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::Malformed(format!("{}: {}", e, body.trim())))?;
        parsed.name.filter(|name| !name.is_empty()).ok_or_else(|| {
            TransportError::Malformed("success response without message name".to_string())
        })
    }

    pub(crate) fn request_body(message: &PushMessage) -> serde_json::Value {
        let mut body = serde_json::json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
            }
        });
        if let Some(tag) = message.data.get(TAG_KEY) {
            body["message"]["webpush"] = serde_json::json!({ "notification": { "tag": tag } });
        }
        body
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    fn name(&self) -> &str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage) -> Result<String, TransportError> {
        match self.post(message).await {
            Err(TransportError::Unauthenticated(detail))
                if self.credentials.tokens().can_refresh() =>
            {
                tracing::warn!(%detail, "FCM rejected the access token, minting a new one");
                self.credentials.tokens().invalidate().await;
                self.post(message).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataMap;

    #[test]
    fn test_classify_unregistered() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND","details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert!(matches!(
            classify_error(404, body),
            TransportError::Unregistered(_)
        ));
    }

    #[test]
    fn test_classify_invalid_token_format() {
        let body = r#"{"error":{"code":400,"message":"The registration token is not a valid FCM registration token","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            classify_error(400, body),
            TransportError::Unregistered(_)
        ));
    }

    #[test]
    fn test_classify_other_statuses() {
        assert!(matches!(
            classify_error(401, "unauthorized"),
            TransportError::Unauthenticated(_)
        ));
        assert!(matches!(
            classify_error(503, ""),
            TransportError::Unavailable(_)
        ));
        assert!(matches!(
            classify_error(429, "{}"),
            TransportError::Unavailable(_)
        ));
        let body = r#"{"error":{"code":400,"message":"Invalid JSON payload","status":"INVALID_ARGUMENT"}}"#;
        match classify_error(400, body) {
            TransportError::Rejected(detail) => assert!(detail.contains("Invalid JSON payload")),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let mut data = DataMap::new();
        data.insert("action".to_string(), "refresh".to_string());
        data.insert("tag".to_string(), "t1".to_string());
        let message = PushMessage {
            token: "device".to_string(),
            title: "Hi".to_string(),
            body: "there".to_string(),
            data,
        };

        let body = FcmTransport::request_body(&message);
        assert_eq!(body["message"]["token"], "device");
        assert_eq!(body["message"]["notification"]["title"], "Hi");
        assert_eq!(body["message"]["data"]["action"], "refresh");
        assert_eq!(body["message"]["webpush"]["notification"]["tag"], "t1");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = FcmCredentials::new("demo", "ya29.secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("demo"));
        assert!(!debug.contains("ya29.secret"));
    }

    #[test]
    fn test_resolve_requires_project() {
        let err = FcmCredentials::resolve(" ").unwrap_err();
        assert!(matches!(err, TransportError::Unauthenticated(_)));
    }
}
