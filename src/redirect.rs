// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Redirect policy.
//!
//! Visitors who land on a CMS-rendered page are sent to the external
//! frontend at the same path. With no delay this is a 301 issued before
//! any routing; with a delay the visitor gets a holding page that
//! navigates on a client-side timer.

use crate::config::Settings;
use std::time::Duration;

/// Path prefixes that never redirect: the API, admin and login surfaces,
/// health checks and crawler files.
const BYPASS_PREFIXES: &[&str] = &[
    "/wp-json",
    "/wp-admin",
    "/wp-login",
    "/admin",
    "/health",
    "/favicon.ico",
    "/robots.txt",
];

/// Outcome of the redirect policy for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectDecision {
    /// Redirects disabled or no frontend configured: render local content.
    Fallback,
    /// Immediate 301 to `target`.
    Permanent { target: String },
    /// Holding page that navigates to `target` after `delay`.
    Holding { target: String, delay: Duration },
}

/// Which local page the fallback renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Redirecting,
    NotFound,
}

/// Frontend URL without trailing slashes followed by the original path and query.
pub fn redirect_target(frontend_url: &str, path_and_query: &str) -> String {
    format!("{}{}", frontend_url.trim_end_matches('/'), path_and_query)
}

/// Decide what to do with a page request.
pub fn decide(settings: &Settings, path_and_query: &str) -> RedirectDecision {
    if !settings.redirect_enabled || settings.frontend_url.is_empty() {
        return RedirectDecision::Fallback;
    }

    let target = redirect_target(&settings.frontend_url, path_and_query);
    if settings.redirect_delay <= 0.0 {
        RedirectDecision::Permanent { target }
    } else {
        RedirectDecision::Holding {
            target,
            delay: settings.redirect_delay_duration(),
        }
    }
}

/// Whether `path` is exempt from redirecting.
pub fn is_bypassed(path: &str, metrics_path: &str) -> bool {
    path == metrics_path
        || BYPASS_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// Render the local page for a request that was not redirected by a 301.
pub fn render_page(kind: PageKind, decision: &RedirectDecision, frontend_url: &str) -> String {
    let (title, body) = match kind {
        PageKind::Redirecting => (
            "Redirecting...",
            "<div class=\"headless-redirect-loader\"></div>\n  \
             <p>You are being redirected to our frontend application.</p>",
        ),
        PageKind::NotFound => (
            "Page Not Found",
            "<p>The page you are looking for does not exist.</p>",
        ),
    };

    let link = if frontend_url.is_empty() {
        String::new()
    } else {
        let text = match kind {
            PageKind::Redirecting => "Click here if you are not redirected automatically",
            PageKind::NotFound => "Visit our frontend application",
        };
        format!(
            "\n  <p><a href=\"{}\" id=\"manual-redirect\">{}</a></p>",
            escape_html(frontend_url),
            text
        )
    };

    let script = match decision {
        RedirectDecision::Holding { target, delay } => format!(
            "\n<script>\ndocument.addEventListener('DOMContentLoaded', function() {{\n  \
             setTimeout(function() {{\n    window.location.href = {};\n  }}, {});\n}});\n</script>",
            script_string(target),
            delay.as_millis()
        ),
        _ => String::new(),
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body>\n<div class=\"headless-redirect-message\">\n  <h1>{title}</h1>\n  {body}{link}\n</div>{script}\n\
         </body>\n</html>\n"
    )
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON string literal safe to embed inside a `<script>` element.
fn script_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}
