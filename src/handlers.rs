// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for health, metrics, the administrative surface and
//! the page fallback.

use crate::api;
use crate::config::Config;
use crate::content::{ContentRepository, PostInput};
use crate::error::{AppError, Result};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::redirect::{self, PageKind};
use crate::settings::{SettingsError, SettingsHandle};
use crate::validator::SettingsUpdate;
use crate::webhook::{WebhookDispatcher, WebhookPayload, WebhookTestOutcome};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub settings: SettingsHandle,
    pub limiter: RateLimiter,
    pub content: ContentRepository,
    pub webhooks: WebhookDispatcher,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Build the state from configuration, loading stored settings and
    /// seed content when files are configured.
    pub async fn from_config(config: Config) -> Result<Self> {
        let settings = match &config.settings_file {
            Some(path) => SettingsHandle::open(path, config.settings.clone()).await,
            None => SettingsHandle::new(config.settings.clone()),
        };

        let content = match &config.content_file {
            Some(path) => ContentRepository::load(path)
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?,
            None => ContentRepository::default(),
        };

        Self::new(config, settings, content)
    }

    pub fn new(config: Config, settings: SettingsHandle, content: ContentRepository) -> Result<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| AppError::Internal(e.to_string()))?);
        let webhooks = WebhookDispatcher::new(metrics.clone())?;

        Ok(Self {
            config,
            settings,
            limiter: RateLimiter::new(),
            content,
            webhooks,
            metrics,
        })
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(e) => AppError::Validation(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Success envelope used by the admin actions.
#[derive(Debug, Serialize)]
pub struct AdminResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CacheCleared {
    pub message: &'static str,
    pub cleared_counters: usize,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: u64,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "headless-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Local page for anything the redirect stage let through. Unknown REST
/// paths get the REST 404 instead.
pub async fn page(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    if uri.path().starts_with("/wp-json/") {
        return api::no_route().await.into_response();
    }

    let settings = state.settings.snapshot().await;
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let decision = redirect::decide(&settings, path_and_query);

    let (status, kind) = if state.content.resolves(uri.path()).await {
        (StatusCode::OK, PageKind::Redirecting)
    } else {
        (StatusCode::NOT_FOUND, PageKind::NotFound)
    };

    if let redirect::RedirectDecision::Holding { .. } = decision {
        state.metrics.redirects.with_label_values(&["holding"]).inc();
    } else if kind == PageKind::NotFound {
        state.metrics.redirects.with_label_values(&["not_found"]).inc();
    }

    (
        status,
        Html(redirect::render_page(kind, &decision, &settings.frontend_url)),
    )
        .into_response()
}

/// `GET /admin/settings`
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Response {
    Json(state.settings.snapshot().await.as_ref().clone()).into_response()
}

/// `PUT /admin/settings`
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Response> {
    let settings = state.settings.update(update).await?;
    Ok(Json(settings.as_ref().clone()).into_response())
}

/// `POST /admin/webhook/test`
pub async fn test_webhook(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminResponse<WebhookTestOutcome>>> {
    let settings = state.settings.snapshot().await;
    let outcome = state
        .webhooks
        .send_test(&settings, &state.config.site.url)
        .await
        .inspect_err(|e| warn!(error = %e, "Test webhook failed"))?;

    Ok(Json(AdminResponse {
        success: true,
        data: outcome,
    }))
}

/// `POST /admin/cache/clear`
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<AdminResponse<CacheCleared>> {
    let cleared = state.limiter.clear().await;
    info!(cleared, "Cache cleared");

    let settings = state.settings.snapshot().await;
    if settings.webhook_configured() {
        let payload =
            WebhookPayload::cache_cleared(&state.config.site.url, chrono::Utc::now().timestamp());
        state.webhooks.dispatch(&settings, payload);
    }

    Json(AdminResponse {
        success: true,
        data: CacheCleared {
            message: "Cache cleared successfully",
            cleared_counters: cleared,
        },
    })
}

/// `PUT /admin/posts/{id}`: create or update a post.
pub async fn save_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(input): Json<PostInput>,
) -> Response {
    let change = state.content.upsert_post(id, input).await;

    let settings = state.settings.snapshot().await;
    state
        .webhooks
        .notify_change(&settings, &change, &state.config.site.url);

    let status = match &change {
        crate::content::ContentChange::Saved { updated: false, .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    (status, Json(change.post().clone())).into_response()
}

/// `DELETE /admin/posts/{id}`
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Deleted>> {
    let change = state
        .content
        .delete_post(id)
        .await
        .ok_or_else(|| AppError::not_found("rest_post_invalid_id", "Invalid post ID."))?;

    let settings = state.settings.snapshot().await;
    state
        .webhooks
        .notify_change(&settings, &change, &state.config.site.url);

    Ok(Json(Deleted { deleted: true, id }))
}
