// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cache policy for REST responses.
//!
//! Lifetimes are chosen per route, first match wins:
//!
//! | route contains           | max-age            |
//! |--------------------------|--------------------|
//! | `/wp/v2/posts`, `/pages` | `post_cache_time`  |
//! | `/headless/v1/site-info` | 3600               |
//! | `/headless/v1/menus`     | `menu_cache_time`  |
//! | anything else            | 300                |
//!
//! The ETag hashes the route and its sorted query parameters, not the
//! response body. Two different bodies served at the same route and
//! parameters share an ETag.

use crate::config::Settings;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sha2::{Digest, Sha256};

pub const SITE_INFO_TTL: u64 = 3600;
pub const DEFAULT_TTL: u64 = 300;

/// Headers to attach to one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirective {
    pub max_age: u64,
    pub etag: String,
}

/// Cache lifetime in seconds for a REST route.
pub fn ttl_for_route(route: &str, settings: &Settings) -> u64 {
    if route.contains("/wp/v2/posts") || route.contains("/wp/v2/pages") {
        settings.post_cache_time
    } else if route.contains("/headless/v1/site-info") {
        SITE_INFO_TTL
    } else if route.contains("/headless/v1/menus") {
        settings.menu_cache_time
    } else {
        DEFAULT_TTL
    }
}

/// Quoted ETag over the route and its query parameters sorted by key then value.
pub fn etag(route: &str, query: Option<&str>) -> String {
    let mut params: Vec<(String, String)> = query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();
    params.sort();

    let mut hasher = Sha256::new();
    hasher.update(route.as_bytes());
    for (key, value) in &params {
        hasher.update(b"\0");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    format!("\"{}\"", hex::encode(&hasher.finalize()[..16]))
}

/// Directive for a REST route, or `None` when caching is switched off.
pub fn directive(settings: &Settings, route: &str, query: Option<&str>) -> Option<CacheDirective> {
    if !settings.cache_enabled {
        return None;
    }

    Some(CacheDirective {
        max_age: ttl_for_route(route, settings),
        etag: etag(route, query),
    })
}

/// `Expires` value in RFC 1123 form.
pub fn expires_at(now: DateTime<Utc>, max_age: u64) -> String {
    let seconds = i64::try_from(max_age).unwrap_or(i64::MAX);
    let expires = now
        .checked_add_signed(ChronoDuration::seconds(seconds))
        .unwrap_or(now);
    expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl CacheDirective {
    pub fn apply(&self, headers: &mut HeaderMap, now: DateTime<Utc>) {
        let values = [
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", self.max_age),
            ),
            (header::EXPIRES, expires_at(now, self.max_age)),
            (header::ETAG, self.etag.clone()),
        ];

        for (name, value) in values {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_route_ttls() {
        let settings = Settings {
            post_cache_time: 120,
            menu_cache_time: 900,
            ..Default::default()
        };
        assert_eq!(ttl_for_route("/wp/v2/posts", &settings), 120);
        assert_eq!(ttl_for_route("/wp/v2/pages/12", &settings), 120);
        assert_eq!(ttl_for_route("/headless/v1/site-info", &settings), SITE_INFO_TTL);
        assert_eq!(ttl_for_route("/headless/v1/menus/primary", &settings), 900);
        assert_eq!(ttl_for_route("/headless/v1/search", &settings), DEFAULT_TTL);
    }

    #[test]
    fn test_etag_ignores_param_order() {
        let a = etag("/wp/v2/posts", Some("page=2&per_page=10"));
        let b = etag("/wp/v2/posts", Some("per_page=10&page=2"));
        assert_eq!(a, b);
        assert_ne!(a, etag("/wp/v2/posts", Some("page=3&per_page=10")));
        assert_ne!(a, etag("/wp/v2/pages", Some("page=2&per_page=10")));
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_disabled_cache_yields_no_directive() {
        let settings = Settings {
            cache_enabled: false,
            ..Default::default()
        };
        assert!(directive(&settings, "/wp/v2/posts", None).is_none());
    }

    #[test]
    fn test_apply_headers() {
        let settings = Settings {
            post_cache_time: 120,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut headers = HeaderMap::new();
        directive(&settings, "/wp/v2/posts", None)
            .unwrap()
            .apply(&mut headers, now);

        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=120");
        assert_eq!(headers[header::EXPIRES], "Mon, 01 Jan 2024 12:02:00 GMT");
        assert!(headers.contains_key(header::ETAG));
    }
}
