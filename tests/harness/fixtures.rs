// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Application fixtures and request helpers.

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{Method, Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use headless_gateway::{
    build_router,
    config::{Config, Settings},
    content::{Author, ContentRepository, ContentSeed, Menu, MenuItem, Post, PostStatus},
    settings::SettingsHandle,
    AppState,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const SITE_URL: &str = "https://cms.example.com";

pub fn config() -> Config {
    let mut config = Config::default();
    config.site.url = SITE_URL.to_string();
    config.site.name = "Example".to_string();
    config
}

fn post(id: u64, post_type: &str, slug: &str, day: u32, status: PostStatus) -> Post {
    let mut meta = BTreeMap::new();
    meta.insert("_edit_lock".to_string(), vec![serde_json::json!("1700000000:1")]);
    meta.insert("subtitle".to_string(), vec![serde_json::json!(format!("About {slug}"))]);

    Post {
        id,
        post_type: post_type.to_string(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        content: format!("<p>Hello from {slug}. This post talks about headless sites.</p>"),
        excerpt: String::new(),
        status,
        date: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
        author: 1,
        featured_image: None,
        meta,
    }
}

/// A small site: three posts, one draft, one page, a primary menu.
pub fn seed() -> ContentSeed {
    let mut locations = BTreeMap::new();
    locations.insert("primary".to_string(), 10);
    locations.insert("orphaned".to_string(), 99);

    ContentSeed {
        posts: vec![
            post(1, "post", "hello-world", 1, PostStatus::Publish),
            post(2, "post", "second-post", 2, PostStatus::Publish),
            post(3, "post", "third-post", 3, PostStatus::Publish),
            post(4, "post", "unfinished", 4, PostStatus::Draft),
            post(5, "page", "about", 1, PostStatus::Publish),
        ],
        authors: vec![Author {
            id: 1,
            display_name: "Ada".to_string(),
            avatar: "https://cms.example.com/avatar/1.png".to_string(),
            bio: "Writes things.".to_string(),
        }],
        menus: vec![Menu {
            id: 10,
            name: "Main".to_string(),
            items: vec![
                MenuItem {
                    id: 100,
                    title: "Home".to_string(),
                    url: "/".to_string(),
                    target: String::new(),
                    classes: vec![],
                    parent: 0,
                },
                MenuItem {
                    id: 101,
                    title: "Blog".to_string(),
                    url: "/blog/".to_string(),
                    target: String::new(),
                    classes: vec!["highlight".to_string()],
                    parent: 0,
                },
                MenuItem {
                    id: 102,
                    title: "Archive".to_string(),
                    url: "/blog/archive/".to_string(),
                    target: "_blank".to_string(),
                    classes: vec![],
                    parent: 101,
                },
            ],
        }],
        locations,
    }
}

pub fn state_with(config: Config, settings: Settings) -> Arc<AppState> {
    Arc::new(
        AppState::new(
            config,
            SettingsHandle::new(settings),
            ContentRepository::from_seed(seed()),
        )
        .expect("state"),
    )
}

pub fn app(settings: Settings) -> (Router, Arc<AppState>) {
    let state = state_with(config(), settings);
    (build_router(state.clone()), state)
}

/// Settings with redirects switched off, so page tests see local content.
pub fn no_redirect() -> Settings {
    Settings {
        redirect_enabled: false,
        ..Default::default()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri, Body::empty())
}

pub fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, value: serde_json::Value) -> Request<Body> {
    request(method, uri, Body::from(value.to_string()))
}

/// Attach the peer address the server would have seen.
pub fn from_peer(mut request: Request<Body>, peer: SocketAddr) -> Request<Body> {
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
