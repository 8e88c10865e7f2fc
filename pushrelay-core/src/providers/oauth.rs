//! OAuth2 access tokens for the FCM service account.
//!
//! Tokens are cached with their expiry and minted again shortly before they run out, either
//! from the instance metadata server or through a signed service-account JWT grant.

use crate::providers::TransportError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Service-account token endpoint of the instance metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// OAuth2 token endpoint for service-account JWT grants.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope required by the FCM HTTP v1 API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Environment variable holding a ready OAuth2 access token. It is never refreshed.
pub const ACCESS_TOKEN_ENV: &str = "PUSHRELAY_FCM_ACCESS_TOKEN";
pub const CLIENT_EMAIL_ENV: &str = "FIREBASE_CLIENT_EMAIL";
pub const PRIVATE_KEY_ENV: &str = "FIREBASE_PRIVATE_KEY";

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Mint a new token this long before the cached one expires.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime requested for a signed assertion (Google caps it at one hour).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Assumed lifetime when a token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Service-account identity used for the JWT bearer grant.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountKey {
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into(),
            token_uri: default_token_uri(),
        }
    }

    /// Exchange assertions at a different token endpoint (e.g. a local fake).
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Read `FIREBASE_CLIENT_EMAIL` and `FIREBASE_PRIVATE_KEY`. Escaped `\n` sequences in the
    /// key are turned back into newlines, as deployment environments usually store it that way.
    pub fn from_env() -> Option<Self> {
        let client_email = non_empty_env(CLIENT_EMAIL_ENV)?;
        let private_key = non_empty_env(PRIVATE_KEY_ENV)?.replace("\\n", "\n");
        Some(Self::new(client_email, private_key))
    }

    /// Signed RS256 assertion for the FCM scope, valid from `now`.
    fn assertion(&self, now: i64) -> Result<String, TransportError> {
        let claims = GrantClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            TransportError::Unauthenticated(format!("invalid service account key: {}", e))
        })?;
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
            TransportError::Unauthenticated(format!("failed to sign assertion: {}", e))
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Where access tokens come from
#[derive(Clone)]
pub enum TokenGrant {
    /// Pre-minted token; used until the provider rejects it
    Static(String),
    /// Metadata-server style endpoint answering GET with `Metadata-Flavor: Google`
    Metadata { url: String },
    /// JWT bearer grant signed with the service-account key
    ServiceAccount(ServiceAccountKey),
}

impl TokenGrant {
    /// Pick a grant from the environment: a ready token, then a service-account key, then the
    /// metadata server.
    pub fn from_env() -> Self {
        if let Some(token) = non_empty_env(ACCESS_TOKEN_ENV) {
            return TokenGrant::Static(token);
        }
        if let Some(key) = ServiceAccountKey::from_env() {
            return TokenGrant::ServiceAccount(key);
        }
        TokenGrant::Metadata {
            url: METADATA_TOKEN_URL.to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TokenGrant::Static(_) => "static",
            TokenGrant::Metadata { .. } => "metadata",
            TokenGrant::ServiceAccount(_) => "service_account",
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenGrant::Static(_) => f.write_str("Static(<redacted>)"),
            TokenGrant::Metadata { url } => f.debug_struct("Metadata").field("url", url).finish(),
            TokenGrant::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

struct CachedToken {
    value: String,
    /// `None` for tokens without a known expiry
    refresh_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.refresh_at.map_or(true, |at| now < at)
    }
}

/// Caching access-token source shared by every send.
pub struct AccessTokenProvider {
    grant: TokenGrant,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for AccessTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenProvider")
            .field("grant", &self.grant)
            .finish()
    }
}

impl AccessTokenProvider {
    pub fn new(grant: TokenGrant) -> Self {
        Self {
            grant,
            client: Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Whether a rejected token can be replaced by minting again.
    pub fn can_refresh(&self) -> bool {
        !matches!(self.grant, TokenGrant::Static(_))
    }

    /// Current access token, minted again when the cached one is close to expiry.
    /// Concurrent callers wait on the same refresh.
    pub async fn access_token(&self) -> Result<String, TransportError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let fresh = self.mint().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Drop the cached token so the next call mints a new one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn mint(&self) -> Result<CachedToken, TransportError> {
        let started = Instant::now();
        let response = match &self.grant {
            TokenGrant::Static(token) => {
                return Ok(CachedToken {
                    value: token.clone(),
                    refresh_at: None,
                })
            }
            TokenGrant::Metadata { url } => self
                .client
                .get(url)
                .header("Metadata-Flavor", "Google")
                .send()
                .await
                .map_err(unreachable_endpoint)?,
            TokenGrant::ServiceAccount(key) => {
                let assertion = key.assertion(Utc::now().timestamp())?;
                self.client
                    .post(&key.token_uri)
                    .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
                    .send()
                    .await
                    .map_err(unreachable_endpoint)?
            }
        };

        let token = read_token_response(response).await?;
        let lifetime =
            Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        tracing::debug!(
            grant = self.grant.label(),
            expires_in = lifetime.as_secs(),
            "minted FCM access token"
        );
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Some(started + lifetime.saturating_sub(REFRESH_MARGIN)),
        })
    }
}

fn unreachable_endpoint(e: reqwest::Error) -> TransportError {
    TransportError::Unauthenticated(format!("token endpoint unreachable: {}", e))
}

async fn read_token_response(res: reqwest::Response) -> Result<TokenResponse, TransportError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(TransportError::Unauthenticated(format!(
            "token endpoint error {}: {}",
            status,
            body.trim()
        )));
    }

    let token: TokenResponse = res.json().await.map_err(|e| {
        TransportError::Unauthenticated(format!("unreadable token response: {}", e))
    })?;
    if token.access_token.trim().is_empty() {
        return Err(TransportError::Unauthenticated(
            "token endpoint returned an empty token".to_string(),
        ));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_freshness() {
        let now = Instant::now();
        let never = CachedToken {
            value: "t".to_string(),
            refresh_at: None,
        };
        assert!(never.is_fresh(now));

        let due = CachedToken {
            value: "t".to_string(),
            refresh_at: Some(now),
        };
        assert!(!due.is_fresh(now));
        assert!(due.is_fresh(now - Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_static_grant_is_not_refreshable() {
        let tokens = AccessTokenProvider::new(TokenGrant::Static("ya29.static".to_string()));
        assert!(!tokens.can_refresh());
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.static");
        tokens.invalidate().await;
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.static");
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let key = ServiceAccountKey::new("relay@demo.iam.gserviceaccount.com", "-----BEGIN");
        let debug = format!("{:?}", key);
        assert!(debug.contains("relay@demo"));
        assert!(!debug.contains("BEGIN"));

        let tokens = AccessTokenProvider::new(TokenGrant::Static("ya29.secret".to_string()));
        assert!(!format!("{:?}", tokens).contains("ya29.secret"));
    }

    #[test]
    fn test_invalid_key_fails_to_sign() {
        let key = ServiceAccountKey::new("relay@demo.iam.gserviceaccount.com", "not a pem");
        assert!(matches!(
            key.assertion(0),
            Err(TransportError::Unauthenticated(_))
        ));
    }
}
