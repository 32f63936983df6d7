// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Headless Gateway
//!
//! Turns a CMS backend into a thin redirect and API shim for a separately
//! hosted frontend:
//!
//! - 301 redirects from CMS pages to the frontend (or a timed holding page)
//! - CORS headers from an origin allow-list
//! - Per-route `Cache-Control`/`Expires`/`ETag` on REST responses
//! - Fixed-window per-IP rate limiting (60 rpm default)
//! - Signed, fire-and-forget webhooks on content changes
//! - Convenience REST endpoints: site info, menus, search, breadcrumbs

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod content;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod redirect;
pub mod settings;
pub mod validator;
pub mod webhook;

pub use app::build_router;
pub use config::{Config, Settings};
pub use error::AppError;
pub use handlers::AppState;
pub use limiter::{RateLimitResult, RateLimiter};
pub use webhook::{WebhookDispatcher, WebhookPayload};
