// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Router and middleware composition.

use crate::api;
use crate::handlers::{self, AppState};
use crate::middleware;
use axum::{
    middleware::from_fn_with_state,
    routing::{any, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the full application.
///
/// Layers run outermost first: trace, security headers, redirect, CORS.
/// REST routes add the rate limiter and cache headers; admin routes add
/// the token check.
pub fn build_router(state: Arc<AppState>) -> Router {
    let rest = Router::new()
        .route("/wp-json/headless/v1/site-info", get(api::site_info))
        .route("/wp-json/headless/v1/menus/:location", get(api::menu_by_location))
        .route("/wp-json/headless/v1/search", get(api::search))
        .route("/wp-json/headless/v1/breadcrumbs", get(api::breadcrumbs))
        .route("/wp-json/wp/v2/posts", get(api::list_posts))
        .route("/wp-json/wp/v2/posts/:id", get(api::get_post))
        .route("/wp-json/wp/v2/pages", get(api::list_pages))
        .route("/wp-json/wp/v2/pages/:id", get(api::get_page))
        .route("/wp-json", any(api::no_route))
        .route_layer(from_fn_with_state(state.clone(), middleware::cache_headers))
        .route_layer(from_fn_with_state(state.clone(), middleware::rate_limit));

    let admin = Router::new()
        .route(
            "/admin/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/admin/webhook/test", post(handlers::test_webhook))
        .route("/admin/cache/clear", post(handlers::clear_cache))
        .route(
            "/admin/posts/:id",
            put(handlers::save_post).delete(handlers::delete_post),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::admin_auth));

    let mut app = Router::new()
        .merge(rest)
        .merge(admin)
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(handlers::metrics));
    }

    app.fallback(handlers::page)
        .layer(from_fn_with_state(state.clone(), middleware::cors))
        .layer(from_fn_with_state(state.clone(), middleware::redirect))
        .layer(from_fn_with_state(state.clone(), middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
