use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span, field};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::Identity;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 64;

/// `GET /api/metrics`, Prometheus text format.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Tags the current request span with the authenticated caller.
pub fn record_identity(identity: &Identity) {
    let span = Span::current();
    span.record("user_id", identity.user_id);
    span.record("role", identity.role.as_str());
    if let Some(unit_id) = identity.unit_id {
        span.record("unit_id", unit_id);
    }
}

/// Reuses a sane `x-request-id` from the caller (a proxy or the frontend),
/// otherwise mints one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

const fn outcome(status: StatusCode) -> &'static str {
    match status.as_u16() {
        401 | 403 => "denied",
        400..=499 => "client_error",
        500..=599 => "error",
        _ => "success",
    }
}

/// One span per request, tagged later by the auth middleware with the
/// caller's id, role and unit. Finishes with a single summary event and the
/// HTTP metrics.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        user_id = field::Empty,
        role = field::Empty,
        unit_id = field::Empty,
    );

    async move {
        let mut response = next.run(req).await;
        let status = response.status();
        let elapsed = start.elapsed();

        // Route templates keep label cardinality bounded.
        let route = route.unwrap_or(path);
        let labels = [
            ("method", method.to_string()),
            ("route", route),
            ("status", status.as_str().to_string()),
        ];
        metrics::counter!("assetdesk_http_requests_total", &labels).increment(1);
        metrics::histogram!("assetdesk_http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let code = status.as_u16();
        if status.is_server_error() {
            tracing::warn!(status = code, elapsed_ms, outcome = outcome(status), "Request failed");
        } else {
            tracing::info!(status = code, elapsed_ms, outcome = outcome(status), "Request finished");
        }

        response
    }
    .instrument(span)
    .await
}

/// JSON-only API: forbid sniffing, framing and any embedded content.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    #[test]
    fn test_request_id_is_reused_when_sane() {
        assert_eq!(request_id(&headers_with("helpdesk-42")), "helpdesk-42");
    }

    #[test]
    fn test_request_id_is_minted_otherwise() {
        let minted = request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&minted).is_ok());

        let odd = request_id(&headers_with("a b;c"));
        assert!(Uuid::parse_str(&odd).is_ok());

        let long = request_id(&headers_with(&"x".repeat(65)));
        assert!(Uuid::parse_str(&long).is_ok());
    }

    #[test]
    fn test_outcome() {
        assert_eq!(outcome(StatusCode::CREATED), "success");
        assert_eq!(outcome(StatusCode::FORBIDDEN), "denied");
        assert_eq!(outcome(StatusCode::CONFLICT), "client_error");
        assert_eq!(outcome(StatusCode::INTERNAL_SERVER_ERROR), "error");
    }
}
