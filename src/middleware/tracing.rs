//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Instrument;

/// Log each request inside a span carrying its request ID
///
/// Must run inside the layer that assigns `x-request-id`.
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let span = tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        request_id = %request_id,
    );

    async move {
        let start = Instant::now();
        let response = next.run(request).await;
        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis() as u64;

        if response.status().is_server_error() {
            tracing::error!(status, duration_ms, "Request completed with error");
        } else if response.status().is_client_error() {
            tracing::warn!(status, duration_ms, "Request completed with client error");
        } else {
            tracing::info!(status, duration_ms, "Request completed");
        }

        response
    }
    .instrument(span)
    .await
}
