// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Read-only REST endpoints for the frontend.
//!
//! `headless/v1` adds site info, menus by location, search and
//! breadcrumbs. The `wp/v2` posts and pages collections are served with
//! extra fields: image sizes, reading time, adjacent-post navigation,
//! public meta and author details.

use crate::content::{Menu, MenuItem, MenuLookupError, Post};
use crate::error::{AppError, Result};
use crate::handlers::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Words per minute used for the reading time estimate.
const READING_WPM: usize = 200;
const EXCERPT_WORDS: usize = 20;
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Serialize)]
pub struct SiteInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub timezone: String,
    pub date_format: String,
    pub time_format: String,
    pub frontend_url: String,
    pub theme_version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MenuNode {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub target: String,
    pub classes: String,
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub id: u64,
    pub name: String,
    pub items: Vec<MenuNode>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(default = "default_search_type")]
    pub post_type: String,
    #[serde(default)]
    pub per_page: Option<String>,
}

fn default_search_type() -> String {
    "post".to_string()
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    pub link: String,
    pub date: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub featured_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct BreadcrumbParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Breadcrumb {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

/// `GET /wp-json/headless/v1/site-info`
pub async fn site_info(State(state): State<Arc<AppState>>) -> Json<SiteInfo> {
    let settings = state.settings.snapshot().await;
    let site = &state.config.site;
    Json(SiteInfo {
        name: site.name.clone(),
        description: site.description.clone(),
        url: site.url.clone(),
        language: site.language.clone(),
        timezone: site.timezone.clone(),
        date_format: site.date_format.clone(),
        time_format: site.time_format.clone(),
        frontend_url: settings.frontend_url.clone(),
        theme_version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /wp-json/headless/v1/menus/{location}`
pub async fn menu_by_location(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> Result<Json<MenuResponse>> {
    if location.is_empty()
        || !location
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::not_found("rest_no_route", "No route was found matching the URL"));
    }

    let menu = state
        .content
        .menu_for_location(&location)
        .await
        .map_err(|e| {
            debug!(%location, error = %e, "Menu lookup failed");
            match e {
                MenuLookupError::LocationNotFound | MenuLookupError::MenuNotFound => {
                    AppError::not_found("menu_not_found", e.to_string())
                }
            }
        })?;

    Ok(Json(menu_response(menu)))
}

fn menu_response(menu: Menu) -> MenuResponse {
    MenuResponse {
        id: menu.id,
        name: menu.name,
        items: build_menu_tree(&menu.items, 0),
    }
}

/// Nest flat menu items under their parents, keeping source order.
///
/// An item whose id already appears among its ancestors is dropped, so
/// duplicate ids in a seed file cannot form a cycle.
pub fn build_menu_tree(items: &[MenuItem], parent: u64) -> Vec<MenuNode> {
    nest_menu_items(items, parent, &mut vec![parent])
}

fn nest_menu_items(items: &[MenuItem], parent: u64, path: &mut Vec<u64>) -> Vec<MenuNode> {
    let mut nodes = Vec::new();

    for item in items.iter().filter(|item| item.parent == parent) {
        if path.contains(&item.id) {
            continue;
        }

        path.push(item.id);
        let children = nest_menu_items(items, item.id, path);
        path.pop();

        nodes.push(MenuNode {
            id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            target: item.target.clone(),
            classes: item.classes.join(" "),
            children,
        });
    }

    nodes
}

/// `GET /wp-json/headless/v1/search`
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidParam("query".to_string()))?;

    // Non-numeric per_page sanitizes to 0, which falls back to the default.
    let per_page = params
        .per_page
        .as_deref()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(10)
        .min(MAX_PER_PAGE);

    let (posts, total) = state.content.search(query, &params.post_type, per_page).await;
    let site_url = &state.config.site.url;

    let results = posts
        .into_iter()
        .map(|post| SearchResult {
            id: post.id,
            title: post.title.clone(),
            excerpt: trim_words(&strip_tags(&post.content), EXCERPT_WORDS),
            link: post.permalink(site_url),
            date: post.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            featured_image: post.featured_image.as_ref().map(|img| img.medium.clone()),
            post_type: post.post_type,
        })
        .collect();

    Ok(Json(SearchResponse {
        results,
        total,
        pages: total.div_ceil(per_page),
    }))
}

/// `GET /wp-json/headless/v1/breadcrumbs`
pub async fn breadcrumbs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BreadcrumbParams>,
) -> Result<Json<Vec<Breadcrumb>>> {
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidParam("url".to_string()))?;

    Ok(Json(vec![
        Breadcrumb {
            title: "Home".to_string(),
            url: state.config.site.url.clone(),
        },
        Breadcrumb {
            title: "Current Page".to_string(),
            url: url.to_string(),
        },
    ]))
}

/// `GET /wp-json/wp/v2/posts`
pub async fn list_posts(
    state: State<Arc<AppState>>,
    params: Query<ListParams>,
) -> Json<Vec<Value>> {
    list_type(state, params, "post").await
}

/// `GET /wp-json/wp/v2/pages`
pub async fn list_pages(
    state: State<Arc<AppState>>,
    params: Query<ListParams>,
) -> Json<Vec<Value>> {
    list_type(state, params, "page").await
}

/// `GET /wp-json/wp/v2/posts/{id}`
pub async fn get_post(state: State<Arc<AppState>>, id: Path<u64>) -> Result<Json<Value>> {
    get_type(state, id, "post").await
}

/// `GET /wp-json/wp/v2/pages/{id}`
pub async fn get_page(state: State<Arc<AppState>>, id: Path<u64>) -> Result<Json<Value>> {
    get_type(state, id, "page").await
}

/// Any other `/wp-json` path.
pub async fn no_route() -> AppError {
    AppError::not_found("rest_no_route", "No route was found matching the URL and request method")
}

async fn list_type(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    post_type: &str,
) -> Json<Vec<Value>> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, MAX_PER_PAGE);

    let (posts, _) = state.content.list(post_type, page, per_page).await;
    let mut out = Vec::with_capacity(posts.len());
    for post in &posts {
        out.push(enriched_post(&state, post).await);
    }
    Json(out)
}

async fn get_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    post_type: &str,
) -> Result<Json<Value>> {
    let post = state
        .content
        .published(post_type, id)
        .await
        .ok_or_else(|| AppError::not_found("rest_post_invalid_id", "Invalid post ID."))?;
    Ok(Json(enriched_post(&state, &post).await))
}

/// Post representation with the extra frontend fields.
async fn enriched_post(state: &AppState, post: &Post) -> Value {
    let site_url = &state.config.site.url;

    let mut data = Map::new();
    data.insert("id".into(), json!(post.id));
    data.insert("date".into(), json!(post.date.to_rfc3339()));
    data.insert("slug".into(), json!(post.slug));
    data.insert("status".into(), json!(post.status));
    data.insert("type".into(), json!(post.post_type));
    data.insert("link".into(), json!(post.permalink(site_url)));
    data.insert("title".into(), json!({ "rendered": post.title }));
    data.insert("content".into(), json!({ "rendered": post.content }));
    data.insert("excerpt".into(), json!({ "rendered": post.excerpt }));
    data.insert("author".into(), json!(post.author));

    if let Some(image) = &post.featured_image {
        data.insert("featured_image_sizes".into(), json!(image));
    }

    data.insert("reading_time".into(), json!(reading_time(&post.content)));

    let (previous, next) = state.content.adjacent(post).await;
    data.insert(
        "navigation".into(),
        json!({
            "previous": previous.map(|p| adjacent_summary(&p, site_url)),
            "next": next.map(|p| adjacent_summary(&p, site_url)),
        }),
    );

    data.insert("meta_fields".into(), Value::Object(public_meta(post)));

    if post.post_type == "post" {
        let author = state.content.author(post.author).await;
        data.insert(
            "author_info".into(),
            json!({
                "display_name": author.as_ref().map(|a| a.display_name.as_str()).unwrap_or_default(),
                "avatar": author.as_ref().map(|a| a.avatar.as_str()).unwrap_or_default(),
                "bio": author.as_ref().map(|a| a.bio.as_str()).unwrap_or_default(),
            }),
        );
    }

    Value::Object(data)
}

fn adjacent_summary(post: &Post, site_url: &str) -> Value {
    json!({
        "id": post.id,
        "title": post.title,
        "url": post.permalink(site_url),
        "featured_image": post.featured_image.as_ref().map(|img| img.medium.as_str()),
    })
}

/// Meta keys not starting with `_`; single-value lists are flattened.
pub fn public_meta(post: &Post) -> Map<String, Value> {
    post.meta
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, values)| {
            let value = match values.as_slice() {
                [single] => single.clone(),
                _ => Value::Array(values.clone()),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Minutes to read at [`READING_WPM`], rounded up.
pub fn reading_time(content: &str) -> usize {
    let words = strip_tags(content)
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count();
    words.div_ceil(READING_WPM)
}

/// Drop everything between `<` and `>`.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// First `limit` words, with an ellipsis when anything was cut.
pub fn trim_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        words.join(" ")
    } else {
        format!("{}\u{2026}", words[..limit].join(" "))
    }
}
