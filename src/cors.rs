// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CORS policy shared by page requests and REST responses.
//!
//! An empty allow-list means any origin is allowed. A non-empty list
//! admits only exact matches; anything else gets no CORS headers and is
//! left to fail the browser's same-origin check.

use crate::config::Settings;
use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::BTreeSet;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Authorization, Content-Type, X-WP-Nonce";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// CORS handling switched off: emit nothing.
    Disabled,
    /// Origin not on the allow-list: emit nothing.
    Rejected,
    Allowed {
        allow_origin: String,
        credentials: bool,
    },
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    origins: BTreeSet<String>,
    credentials: bool,
}

impl CorsPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.cors_enabled,
            origins: settings.allowed_origin_set(),
            credentials: settings.cors_credentials,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate the request's `Origin` header.
    ///
    /// Credentialed responses may not carry `*`, so with credentials on and
    /// an open allow-list the request origin is echoed instead.
    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        if !self.enabled {
            return CorsDecision::Disabled;
        }

        if self.origins.is_empty() {
            return match origin {
                Some(origin) if self.credentials => CorsDecision::Allowed {
                    allow_origin: origin.to_string(),
                    credentials: true,
                },
                _ => CorsDecision::Allowed {
                    allow_origin: "*".to_string(),
                    credentials: false,
                },
            };
        }

        match origin {
            Some(origin) if self.origins.contains(origin) => CorsDecision::Allowed {
                allow_origin: origin.to_string(),
                credentials: self.credentials,
            },
            _ => CorsDecision::Rejected,
        }
    }

    /// Write the headers for `decision` into `headers`.
    pub fn apply(decision: &CorsDecision, headers: &mut HeaderMap) {
        let CorsDecision::Allowed {
            allow_origin,
            credentials,
        } = decision
        else {
            return;
        };

        let Ok(origin) = HeaderValue::from_str(allow_origin) else {
            return;
        };

        if allow_origin != "*" {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        if *credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}
