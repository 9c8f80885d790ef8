//! Route a request to Coze or DeepSeek and shape the upstream answer for the caller.
//!
//! Coze-format requests try Coze first when fallback routing is on, and fall back to
//! DeepSeek exactly once on any failure. Chat-format requests always go to DeepSeek
//! and are never translated. When DeepSeek answers a Coze-format request, streams are
//! re-expressed as Coze events.

use crate::error::{ErrorBody, Result};
use crate::logging::RequestLogger;
use crate::server::AppState;
use crate::stream::{self, ByteStream};
use crate::translate::coze_types::CozeRequest;
use crate::translate::detect::InboundPayload;
use crate::translate::request::coze_to_chat;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// Which upstream answered, and therefore which vocabulary the caller gets back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Coze answered a Coze-format request.
    Coze,
    /// DeepSeek answered a Coze-format request.
    DeepSeekAsCoze,
    /// DeepSeek answered a chat-format request.
    DeepSeek,
}

pub enum RelayResponse {
    Stream(ByteStream),
    Json { status: StatusCode, body: Value },
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Stream(s) => stream::sse_response(s),
            Self::Json { status, body } => (status, Json(body)).into_response(),
        }
    }
}

/// Relay one inbound JSON body.
///
/// # Errors
/// `Validation` for unrecognized payloads; otherwise whatever the final upstream
/// attempt failed with.
pub async fn relay(payload: Value, state: &AppState, log: &RequestLogger) -> Result<RelayResponse> {
    let inbound = InboundPayload::parse(payload)?;
    let streaming = inbound.is_streaming();

    log.info(
        "relay",
        format!("Detected {:?} payload streaming={}", inbound.format(), streaming),
    );

    let (route, response) = match inbound {
        InboundPayload::Coze { request, raw } => dispatch_coze(&request, &raw, state, log).await?,
        InboundPayload::Chat(request) => {
            log.info(
                "relay",
                format!(
                    "Routing chat payload to DeepSeek model={} messages={}",
                    request.model,
                    request.messages.len()
                ),
            );
            (Route::DeepSeek, state.deepseek.call(&request).await?)
        }
    };

    log.info(
        "relay",
        format!("{:?} responded status={}", route, response.status().as_u16()),
    );

    let shaped = match (streaming, route) {
        (true, Route::DeepSeekAsCoze) => {
            RelayResponse::Stream(stream::translate_to_coze(response, log.clone()))
        }
        (true, Route::Coze | Route::DeepSeek) => {
            RelayResponse::Stream(stream::passthrough(response, log.clone()))
        }
        (false, _) => finalize(response, log).await,
    };

    Ok(shaped)
}

async fn dispatch_coze(
    request: &CozeRequest,
    raw: &Value,
    state: &AppState,
    log: &RequestLogger,
) -> Result<(Route, reqwest::Response)> {
    if state.config.coze_first() {
        log.info("relay", format!("Attempting Coze POST {}", state.coze.url()));
        match state.coze.call(raw).await {
            Ok(response) => return Ok((Route::Coze, response)),
            Err(e) => log.warn("relay", format!("{}, falling back to DeepSeek", e)),
        }
    } else {
        log.info("relay", "Coze routing disabled, using DeepSeek directly");
    }

    let chat = coze_to_chat(request, &state.config.prompt);
    log.info(
        "relay",
        format!(
            "Routing Coze payload to DeepSeek model={} messages={}",
            chat.model,
            chat.messages.len()
        ),
    );

    let response = state.deepseek.call(&chat).await?;
    Ok((Route::DeepSeekAsCoze, response))
}

/// Buffer a non-streaming upstream body and re-emit it with the upstream status.
/// An unparseable body becomes a local 500.
async fn finalize(response: reqwest::Response, log: &RequestLogger) -> RelayResponse {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::OK);

    match response.json::<Value>().await {
        Ok(body) => RelayResponse::Json { status, body },
        Err(e) => {
            log.error("relay", format!("Failed to parse upstream response: {}", e));
            let err = ErrorBody::new("Failed to parse API response", e.to_string());
            RelayResponse::Json {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: serde_json::to_value(err).unwrap_or(Value::Null),
            }
        }
    }
}
