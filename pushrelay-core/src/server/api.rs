//! HTTP API for callers triggering notifications

use crate::composer::Composer;
use crate::error::ErrorKind;
use crate::models::{
    DataMap, DispatchResult, ErrorResponse, HealthResponse, IssuedToken, NotificationRequest,
    SendResponse,
};
use crate::providers::{LoopbackProvider, TokenSource};
use crate::relay::DispatchRelay;
use crate::services::logging::log_error;
use bytes::Bytes;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

/// Extra data key carrying the server receive time
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Shared state behind the routes.
///
/// The relay is built once at process start. When the provider transport could not be
/// authenticated, the failure reason is kept and every send request returns 500.
pub struct AppState {
    relay: Result<DispatchRelay, String>,
    composer: Composer,
    provider: String,
    /// Set when serving with the loopback provider; enables the token routes
    loopback: Option<LoopbackProvider>,
}

impl AppState {
    pub fn ready(relay: DispatchRelay, composer: Composer) -> Self {
        let provider = relay.provider().to_string();
        Self {
            relay: Ok(relay),
            composer,
            provider,
            loopback: None,
        }
    }

    pub fn unavailable(
        provider: impl Into<String>,
        reason: impl Into<String>,
        composer: Composer,
    ) -> Self {
        Self {
            relay: Err(reason.into()),
            composer,
            provider: provider.into(),
            loopback: None,
        }
    }

    /// Expose token issuance and inbox draining for an in-process loopback provider.
    /// `provider` should be the one the relay sends through.
    pub fn with_loopback(mut self, provider: LoopbackProvider) -> Self {
        self.loopback = Some(provider);
        self
    }

    pub fn transport_ready(&self) -> bool {
        self.relay.is_ok()
    }

    pub fn serves_loopback_tokens(&self) -> bool {
        self.loopback.is_some()
    }
}

/// Create HTTP API routes
pub fn create_api_routes(
    state: Arc<AppState>,
    max_request_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || Arc::clone(&state));

    // POST /notification - Compose and dispatch one notification
    let post_notification = warp::path!("notification")
        .and(warp::post())
        .and(warp::body::content_length_limit(max_request_bytes))
        .and(warp::body::bytes())
        .and(state_filter.clone())
        .and_then(handle_post_notification);

    // GET /api/v1/health - Health check endpoint
    let get_health = warp::path!("api" / "v1" / "health")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_get_health);

    // POST /api/v1/loopback/tokens - Issue a device token (loopback provider only)
    let post_token = warp::path!("api" / "v1" / "loopback" / "tokens")
        .and(warp::post())
        .and(state_filter.clone())
        .and_then(handle_post_loopback_token);

    // GET /api/v1/loopback/tokens/:token/messages - Drain a device inbox (loopback provider only)
    let get_messages = warp::path!("api" / "v1" / "loopback" / "tokens" / String / "messages")
        .and(warp::get())
        .and(state_filter)
        .and_then(handle_get_loopback_messages);

    post_notification
        .or(get_health)
        .or(post_token)
        .or(get_messages)
}

/// HTTP status for a failed dispatch
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingTarget | ErrorKind::InvalidPayload => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidTarget => StatusCode::NOT_FOUND,
        ErrorKind::ProviderUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
    }
}

fn error_reply(
    status: StatusCode,
    error: impl Into<String>,
    kind: Option<ErrorKind>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: error.into(),
        kind,
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

/// Handle POST /notification
async fn handle_post_notification(
    body: Bytes,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let relay = match &state.relay {
        Ok(relay) => relay,
        Err(reason) => {
            log_error(reason, Some("provider transport not ready"));
            return Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("provider transport unavailable: {}", reason),
                None,
            ));
        }
    };

    // Parse JSON manually so malformed bodies map to InvalidPayload
    let request: NotificationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                format!("invalid JSON: {}", e),
                Some(ErrorKind::InvalidPayload),
            ));
        }
    };

    let mut extra = DataMap::new();
    extra.insert(
        TIMESTAMP_KEY.to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    let intent = state.composer.compose_with(
        request.title.as_deref().unwrap_or(""),
        request.body.as_deref().unwrap_or(""),
        request.resolved_action(),
        request.tag.as_deref(),
        extra,
    );

    let token = request.token.as_deref().unwrap_or("");
    match relay.dispatch(token, &intent).await {
        Ok(DispatchResult {
            success: true,
            provider_message_id,
            ..
        }) => {
            let response = SendResponse {
                success: true,
                message_id: provider_message_id.unwrap_or_default(),
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&response),
                StatusCode::OK,
            ))
        }
        Ok(result) => {
            let kind = result.error_kind.unwrap_or(ErrorKind::ProviderUnavailable);
            let message = result
                .error_message
                .unwrap_or_else(|| kind.as_str().to_string());
            Ok(error_reply(status_for(kind), message, Some(kind)))
        }
        Err(fault) => {
            log_error(&fault.to_string(), Some("dispatch"));
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                fault.to_string(),
                None,
            ))
        }
    }
}

/// Handle GET /api/v1/health
async fn handle_get_health(state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    let ready = state.transport_ready();
    let response = HealthResponse {
        status: if ready { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.provider.clone(),
        transport_ready: ready,
    };

    Ok(warp::reply::json(&response))
}

fn loopback_only() -> warp::reply::WithStatus<warp::reply::Json> {
    error_reply(
        StatusCode::NOT_FOUND,
        "token routes are only served with the loopback provider",
        None,
    )
}

/// Handle POST /api/v1/loopback/tokens
async fn handle_post_loopback_token(
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(provider) = &state.loopback else {
        return Ok(loopback_only());
    };

    match provider.request_token().await {
        Ok(token) => Ok(warp::reply::with_status(
            warp::reply::json(&IssuedToken { token }),
            StatusCode::CREATED,
        )),
        Err(e) => Ok(error_reply(
            StatusCode::BAD_GATEWAY,
            e.to_string(),
            e.kind(),
        )),
    }
}

/// Handle GET /api/v1/loopback/tokens/:token/messages
async fn handle_get_loopback_messages(
    token: String,
    state: Arc<AppState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(provider) = &state.loopback else {
        return Ok(loopback_only());
    };
    if !provider.is_active(&token) {
        return Ok(error_reply(
            StatusCode::NOT_FOUND,
            "token is not registered",
            Some(ErrorKind::InvalidTarget),
        ));
    }

    let messages = provider.take_delivered(&token);
    Ok(warp::reply::with_status(
        warp::reply::json(&messages),
        StatusCode::OK,
    ))
}
