use crate::config::RelayConfig;
use crate::error::{ErrorBody, RelayError, Result};
use crate::logging::SharedLogger;
use crate::providers::Provider;
use crate::relay;
use crate::upstream::UpstreamClient;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: RelayConfig,
    pub coze: UpstreamClient,
    pub deepseek: UpstreamClient,
    pub logger: SharedLogger,
}

impl AppState {
    /// Build both upstream clients from a validated config, sharing one connection pool.
    pub fn new(config: RelayConfig, client: reqwest::Client, logger: SharedLogger) -> Self {
        Self {
            coze: UpstreamClient::new(Provider::Coze, &config, client.clone()),
            deepseek: UpstreamClient::new(Provider::DeepSeek, &config, client),
            config,
            logger,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let relay_path = state.config.path.clone();

    Router::new()
        .route(
            &relay_path,
            post(handle_relay)
                .options(handle_preflight)
                .fallback(handle_method_not_allowed),
        )
        .route("/health", get(handle_health))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_relay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let log = state.logger.for_request();

    let payload = match read_json_body(&headers, body, state.config.max_request_size).await {
        Ok(p) => p,
        Err(e) => {
            log.warn("server", format!("Rejected request: {}", e));
            return e.into_response();
        }
    };

    match relay::relay(payload, &state, &log).await {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            log.error("server", format!("Relay error: {}", e));
            e.into_response()
        }
    }
}

/// Read the body under `limit` bytes (inclusive) and parse it as a JSON object.
async fn read_json_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Value> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(RelayError::PayloadTooLarge { limit });
    }

    let bytes = read_limited(body, limit).await?;

    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|_| RelayError::invalid_body("Request body must be a valid JSON object"))?;
    if !payload.is_object() {
        return Err(RelayError::invalid_body(
            "Request body must be a valid JSON object",
        ));
    }

    Ok(payload)
}

async fn read_limited(body: Body, limit: usize) -> Result<Bytes> {
    let mut data = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = data.next().await {
        let chunk = chunk.map_err(|e| {
            RelayError::invalid_body(format!("Failed to read request body: {}", e))
        })?;
        if buf.len() + chunk.len() > limit {
            return Err(RelayError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

async fn handle_method_not_allowed() -> Response {
    let err = ErrorBody::new("Method Not Allowed", "Only POST and OPTIONS are supported");
    (StatusCode::METHOD_NOT_ALLOWED, Json(err)).into_response()
}

async fn handle_health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
