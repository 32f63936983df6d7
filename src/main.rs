// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Headless Gateway Service
//!
//! Sits in front of a CMS whose pages should never be shown directly:
//! visitors are redirected to the external frontend, while the REST API
//! stays reachable with CORS, cache and rate-limit handling, and content
//! changes are pushed to the frontend's webhook.
//!
//! ## Configuration
//!
//! Loaded from `.env`, an optional `headless.toml` (or the file named by
//! `HEADLESS_CONFIG`) and `HEADLESS_*` environment variables:
//!
//! - `HEADLESS_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `HEADLESS_SITE__URL`: Public URL of the CMS
//! - `HEADLESS_SETTINGS__FRONTEND_URL`: Frontend to redirect to
//! - `HEADLESS_SETTINGS__WEBHOOK_URL` / `HEADLESS_SETTINGS__WEBHOOK_SECRET`
//! - `HEADLESS_SETTINGS_FILE`: Persist admin-edited settings here
//! - `HEADLESS_CONTENT_FILE`: Seed content (posts, menus, authors)
//! - `HEADLESS_ADMIN_TOKEN`: Bearer token for `/admin`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use headless_gateway::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        site_url = %config.site.url,
        frontend_url = %config.settings.frontend_url,
        admin_protected = config.admin_token.is_some(),
        "Starting headless gateway"
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::from_config(config).await?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = build_router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
