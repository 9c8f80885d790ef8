//! Relay an upstream streaming body to the caller, verbatim or translated.

use crate::logging::RequestLogger;
use crate::translate::streaming::CozeStreamTranslator;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// Body stream handed to the HTTP layer.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send>>;

/// Forward each upstream chunk unchanged, as it arrives.
pub fn passthrough(response: reqwest::Response, log: RequestLogger) -> ByteStream {
    let byte_stream = response.bytes_stream();

    Box::pin(async_stream::stream! {
        tokio::pin!(byte_stream);
        let mut forwarded = 0usize;

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    forwarded += chunk.len();
                    yield Ok::<Bytes, std::io::Error>(chunk);
                }
                Err(e) => {
                    log.error("stream", format!("Upstream stream error after {} bytes: {}", forwarded, e));
                    break;
                }
            }
        }

        log.info("stream", format!("Passthrough stream closed, {} bytes forwarded", forwarded));
    })
}

/// Re-express a DeepSeek delta stream as Coze `conversation.message.*` events.
pub fn translate_to_coze(response: reqwest::Response, log: RequestLogger) -> ByteStream {
    let byte_stream = response.bytes_stream();

    Box::pin(async_stream::stream! {
        tokio::pin!(byte_stream);
        let mut translator = CozeStreamTranslator::new();
        let mut failed = false;

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    log.error("stream", format!("Upstream stream error during translation: {}", e));
                    failed = true;
                    break;
                }
            };

            for event in translator.process_chunk(&chunk) {
                yield Ok::<Bytes, std::io::Error>(Bytes::from(event.to_sse()));
            }

            if translator.is_finished() {
                break;
            }
        }

        // A transport failure ends the stream without a completion event.
        if !failed {
            for event in translator.finish() {
                yield Ok(Bytes::from(event.to_sse()));
            }
        }

        if translator.skipped() > 0 {
            log.debug("stream", format!("Skipped {} unparseable records", translator.skipped()));
        }
        log.info("stream", "Translated stream completed");
    })
}

/// Wrap a body stream in an event-stream response.
pub fn sse_response(stream: ByteStream) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
