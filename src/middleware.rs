//! Access logging and request telemetry.
//!
//! Generates a UUID v4 for each incoming request and creates a tracing span
//! that wraps the entire request lifecycle. The access line (method and URL,
//! timestamped by the subscriber) is written before the handler runs. When
//! request auto-collection is enabled, the finished request is also handed to
//! the telemetry client.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::state::AppState;
use crate::telemetry::RequestTelemetry;

/// Middleware that logs every request and records it as telemetry.
///
/// This should be the outermost middleware layer so the span wraps
/// all request processing, including other middleware and handlers.
pub async fn access_log_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let url = absolute_url(&uri, request.headers());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        tracing::info!(method = %method, url = %uri, "Request received");

        let response = next.run(request).await;
        let elapsed = start.elapsed();
        let status = response.status();

        tracing::Span::current().record("duration_ms", elapsed.as_millis() as u64);
        tracing::info!(status = status.as_u16(), "Request completed");

        if state.config.telemetry.auto_collect_requests {
            if let Some(client) = &state.telemetry {
                let item = RequestTelemetry {
                    id: request_id.to_string(),
                    name: format!("{} {}", method, uri.path()),
                    url,
                    duration: elapsed,
                    response_code: status.as_u16(),
                    success: status.as_u16() < 400,
                };
                if let Err(e) = client.track_request(item) {
                    tracing::warn!(error = %e, "Failed to record request telemetry");
                }
            }
        }

        response
    }
    .instrument(span)
    .await
}

/// Rebuild the full request URL for telemetry.
///
/// Server-side request targets are origin-form (path and query only), so the
/// authority comes from the `Host` header and the scheme from
/// `X-Forwarded-Proto` when a front end terminates TLS. Without a `Host`
/// header the origin-form target is returned unchanged.
fn absolute_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.authority().is_some() {
        return uri.to_string();
    }
    let Some(host) = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
    else {
        return uri.to_string();
    };
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .unwrap_or("http");
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    format!("{}://{}{}", scheme, host, target)
}
