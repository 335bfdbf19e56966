//! Request gate: per-client rate limiting in front of the `/api` routes.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::rate_limit::Decision;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api";
pub const ANONYMOUS_KEY: &str = "anonymous";

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Gate every `/api` request through the rate limiter.
///
/// Other paths go straight to the router without touching the limiter.
/// A denied request is answered with 429 here and never reaches its handler.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with(API_PREFIX) {
        return next.run(request).await;
    }

    REQUEST_TOTAL.inc();
    let key = client_key(&request, state.trust_forwarded_for);
    let decision = state.limiter.check(&key);
    let limit = state.limiter.policy().limit;

    if !decision.allowed {
        RATE_LIMITED_TOTAL.inc();
        warn!(
            key = %key,
            path = %request.uri().path(),
            retry_after = ?decision.retry_after,
            "Rate limit exceeded"
        );
        return too_many_requests(limit, &decision);
    }

    debug!(key = %key, remaining = decision.remaining, "Rate limit check passed");

    let mut response = next.run(request).await;
    set_quota_headers(response.headers_mut(), limit, decision.remaining);
    response
}

/// Derive the client key, falling back to [`ANONYMOUS_KEY`].
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

fn set_quota_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
}

fn too_many_requests(limit: u32, decision: &Decision) -> Response {
    let mut response = Response::new(Body::from("Too Many Requests"));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    set_quota_headers(headers, limit, 0);

    // whole seconds, rounded up so clients never retry early
    let retry_secs = decision
        .retry_after
        .map(|d| d.as_millis().div_ceil(1000) as u64)
        .unwrap_or(0)
        .max(1);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request_with(addr: Option<&str>, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/v1/chat");
        if let Some(f) = forwarded {
            builder = builder.header(X_FORWARDED_FOR, f);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(a) = addr {
            let addr: SocketAddr = a.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_client_key_from_connection() {
        let request = request_with(Some("10.0.0.7:51234"), None);
        assert_eq!(client_key(&request, false), "10.0.0.7");
    }

    #[test]
    fn test_client_key_falls_back_to_anonymous() {
        let request = request_with(None, None);
        assert_eq!(client_key(&request, false), ANONYMOUS_KEY);
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let request = request_with(Some("10.0.0.7:1"), Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_key(&request, false), "10.0.0.7");
        assert_eq!(client_key(&request, true), "203.0.113.9");
    }

    #[test]
    fn test_blank_forwarded_for_uses_connection() {
        let request = request_with(Some("10.0.0.7:1"), Some(" "));
        assert_eq!(client_key(&request, true), "10.0.0.7");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = Decision {
            allowed: false,
            remaining: 0,
            retry_after: Some(Duration::from_millis(59_900)),
        };
        let response = too_many_requests(50, &decision);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "0");
        assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "50");
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let decision = Decision {
            allowed: false,
            remaining: 0,
            retry_after: Some(Duration::ZERO),
        };
        let response = too_many_requests(50, &decision);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
