// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request pipeline stages.
//!
//! Each stage has one job and reads a fresh settings snapshot. They are
//! composed in [`crate::app::build_router`]:
//!
//! security headers → redirect → CORS → rate limit → handler → cache headers

use crate::cache;
use crate::cors::CorsPolicy;
use crate::error::AppError;
use crate::handlers::AppState;
use crate::limiter::RateLimitResult;
use crate::redirect::{self, RedirectDecision};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::debug;

const WP_JSON_PREFIX: &str = "/wp-json";

/// Adds `X-Content-Type-Options`, `X-Frame-Options` and `Referrer-Policy`.
pub async fn security_headers(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if state.settings.snapshot().await.security_headers {
        let headers = response.headers_mut();
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
    }

    response
}

/// Sends page requests to the frontend with a 301 when no delay is set.
/// Holding pages are rendered later by the page fallback.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if request.method() == Method::OPTIONS
        || redirect::is_bypassed(path, &state.config.metrics.path)
    {
        return next.run(request).await;
    }

    let settings = state.settings.snapshot().await;
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    if let RedirectDecision::Permanent { target } = redirect::decide(&settings, path_and_query) {
        debug!(%target, "Redirecting to frontend");
        state.metrics.redirects.with_label_values(&["permanent"]).inc();
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)]).into_response();
    }

    next.run(request).await
}

/// Emits CORS headers and answers preflight requests.
pub async fn cors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let settings = state.settings.snapshot().await;
    let policy = CorsPolicy::from_settings(&settings);
    if !policy.is_enabled() {
        return next.run(request).await;
    }

    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let decision = policy.evaluate(origin.as_deref());
    if origin.is_some() && decision == crate::cors::CorsDecision::Rejected {
        debug!(origin = ?origin, "Origin not in allow-list");
        state.metrics.cors_rejected.inc();
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    CorsPolicy::apply(&decision, response.headers_mut());
    response
}

/// Fixed-window limit per client IP on REST routes.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let settings = state.settings.snapshot().await;
    if !settings.rate_limiting_enabled {
        return next.run(request).await;
    }

    let ip = client_ip(&request);
    match state.limiter.check(ip, settings.rate_limit_per_minute).await {
        RateLimitResult::Allowed { remaining, .. } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            response
        }
        RateLimitResult::Limited { retry_after } => {
            state.metrics.rate_limited.inc();
            AppError::RateLimitExceeded { retry_after }.into_response()
        }
    }
}

/// `Cache-Control`, `Expires` and `ETag` on successful REST reads.
pub async fn cache_headers(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let cacheable = matches!(*request.method(), Method::GET | Method::HEAD);
    let route = request
        .uri()
        .path()
        .strip_prefix(WP_JSON_PREFIX)
        .unwrap_or(request.uri().path())
        .to_string();
    let query = request.uri().query().map(str::to_string);

    let mut response = next.run(request).await;
    if !cacheable || !response.status().is_success() {
        return response;
    }

    let settings = state.settings.snapshot().await;
    if let Some(directive) = cache::directive(&settings, &route, query.as_deref()) {
        directive.apply(response.headers_mut(), chrono::Utc::now());
    }
    response
}

/// Bearer token check for `/admin` when a token is configured.
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = presented
        .is_some_and(|token| Sha256::digest(token.as_bytes()) == Sha256::digest(expected.as_bytes()));

    if authorized {
        next.run(request).await
    } else {
        AppError::Unauthorized.into_response()
    }
}

/// Peer address of the connection, unspecified when unknown.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
