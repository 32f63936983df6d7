// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory content repository.
//!
//! Stands in for the CMS database: posts, pages, authors and navigation
//! menus, optionally seeded from a JSON document at startup. Mutations
//! return a [`ContentChange`] for the caller to hand to the webhook
//! dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed content file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a menu lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MenuLookupError {
    #[error("Menu location not found")]
    LocationNotFound,
    #[error("Menu not found")]
    MenuNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
    AutoDraft,
    Inherit,
}

impl PostStatus {
    /// Whether a post in this state has been visible to the public.
    pub fn was_public(&self) -> bool {
        matches!(self, Self::Publish | Self::Trash)
    }
}

fn default_post_type() -> String {
    "post".to_string()
}

fn default_status() -> PostStatus {
    PostStatus::Draft
}

fn default_date() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedImage {
    pub thumbnail: String,
    pub medium: String,
    pub large: String,
    pub full: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(rename = "type", default = "default_post_type")]
    pub post_type: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default = "default_status")]
    pub status: PostStatus,
    #[serde(default = "default_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub featured_image: Option<FeaturedImage>,
    /// Raw post meta; keys starting with `_` are private.
    #[serde(default)]
    pub meta: BTreeMap<String, Vec<serde_json::Value>>,
}

impl Post {
    pub fn is_revision(&self) -> bool {
        self.post_type == "revision"
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Publish
    }

    /// Pretty permalink under `site_url`.
    pub fn permalink(&self, site_url: &str) -> String {
        format!("{}/{}/", site_url.trim_end_matches('/'), self.slug)
    }
}

/// Post fields an editor submits. The id comes from the route.
#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
    #[serde(rename = "type", default = "default_post_type")]
    pub post_type: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default = "default_status")]
    pub status: PostStatus,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub featured_image: Option<FeaturedImage>,
    #[serde(default)]
    pub meta: BTreeMap<String, Vec<serde_json::Value>>,
}

impl PostInput {
    fn into_post(self, id: u64, previous_date: Option<DateTime<Utc>>) -> Post {
        Post {
            id,
            post_type: self.post_type,
            slug: self.slug,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            status: self.status,
            date: self.date.or(previous_date).unwrap_or_else(Utc::now),
            author: self.author,
            featured_image: self.featured_image,
            meta: self.meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Parent item id, 0 for top level
    #[serde(default)]
    pub parent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Seed document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSeed {
    pub posts: Vec<Post>,
    pub authors: Vec<Author>,
    pub menus: Vec<Menu>,
    /// Theme location slug -> menu id
    pub locations: BTreeMap<String, u64>,
}

/// A mutation the webhook dispatcher may want to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentChange {
    Saved { post: Post, updated: bool },
    Deleted { post: Post },
}

impl ContentChange {
    pub fn post(&self) -> &Post {
        match self {
            Self::Saved { post, .. } | Self::Deleted { post } => post,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    posts: BTreeMap<u64, Post>,
    authors: HashMap<u64, Author>,
    menus: HashMap<u64, Menu>,
    locations: BTreeMap<String, u64>,
}

pub struct ContentRepository {
    store: RwLock<Store>,
}

impl Default for ContentRepository {
    fn default() -> Self {
        Self::from_seed(ContentSeed::default())
    }
}

impl ContentRepository {
    pub fn from_seed(seed: ContentSeed) -> Self {
        let store = Store {
            posts: seed.posts.into_iter().map(|p| (p.id, p)).collect(),
            authors: seed.authors.into_iter().map(|a| (a.id, a)).collect(),
            menus: seed.menus.into_iter().map(|m| (m.id, m)).collect(),
            locations: seed.locations,
        };
        Self {
            store: RwLock::new(store),
        }
    }

    /// Load a seed document from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let seed: ContentSeed = serde_json::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            posts = seed.posts.len(),
            menus = seed.menus.len(),
            "Loaded content seed"
        );
        Ok(Self::from_seed(seed))
    }

    /// Create or replace post `id`.
    pub async fn upsert_post(&self, id: u64, input: PostInput) -> ContentChange {
        let mut store = self.store.write().await;
        let previous_date = store.posts.get(&id).map(|p| p.date);
        let post = input.into_post(id, previous_date);
        let updated = store.posts.insert(id, post.clone()).is_some();
        ContentChange::Saved { post, updated }
    }

    /// Remove post `id`, returning the change if it existed.
    pub async fn delete_post(&self, id: u64) -> Option<ContentChange> {
        let mut store = self.store.write().await;
        store
            .posts
            .remove(&id)
            .map(|post| ContentChange::Deleted { post })
    }

    /// Published post of `post_type` with `id`.
    pub async fn published(&self, post_type: &str, id: u64) -> Option<Post> {
        let store = self.store.read().await;
        store
            .posts
            .get(&id)
            .filter(|p| p.post_type == post_type && p.is_published())
            .cloned()
    }

    /// Published posts of `post_type`, newest first.
    pub async fn list(&self, post_type: &str, page: usize, per_page: usize) -> (Vec<Post>, usize) {
        let store = self.store.read().await;
        let mut posts: Vec<&Post> = store
            .posts
            .values()
            .filter(|p| p.post_type == post_type && p.is_published())
            .collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        let total = posts.len();
        let page = posts
            .into_iter()
            .skip(page.saturating_sub(1) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        (page, total)
    }

    /// Case-insensitive search over title and content of published posts.
    pub async fn search(&self, query: &str, post_type: &str, per_page: usize) -> (Vec<Post>, usize) {
        let needle = query.to_lowercase();
        let store = self.store.read().await;
        let mut matches: Vec<&Post> = store
            .posts
            .values()
            .filter(|p| p.post_type == post_type && p.is_published())
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.date.cmp(&a.date));

        let total = matches.len();
        (matches.into_iter().take(per_page).cloned().collect(), total)
    }

    /// Published neighbours of `post` within its type, by date:
    /// (previous = older, next = newer).
    pub async fn adjacent(&self, post: &Post) -> (Option<Post>, Option<Post>) {
        let store = self.store.read().await;
        let siblings = store
            .posts
            .values()
            .filter(|p| p.id != post.id && p.post_type == post.post_type && p.is_published());

        let key = |p: &Post| (p.date, p.id);
        let current = key(post);

        let mut previous: Option<&Post> = None;
        let mut next: Option<&Post> = None;
        for candidate in siblings {
            let k = key(candidate);
            if k < current && previous.map_or(true, |p| key(p) < k) {
                previous = Some(candidate);
            }
            if k > current && next.map_or(true, |n| key(n) > k) {
                next = Some(candidate);
            }
        }
        (previous.cloned(), next.cloned())
    }

    pub async fn author(&self, id: u64) -> Option<Author> {
        self.store.read().await.authors.get(&id).cloned()
    }

    /// Menu assigned to a theme location.
    pub async fn menu_for_location(&self, location: &str) -> Result<Menu, MenuLookupError> {
        let store = self.store.read().await;
        let menu_id = store
            .locations
            .get(location)
            .ok_or(MenuLookupError::LocationNotFound)?;
        store
            .menus
            .get(menu_id)
            .cloned()
            .ok_or(MenuLookupError::MenuNotFound)
    }

    /// Whether `path` resolves to the front page or a published permalink.
    pub async fn resolves(&self, path: &str) -> bool {
        let slug = path.trim_matches('/');
        if slug.is_empty() {
            return true;
        }
        let store = self.store.read().await;
        store
            .posts
            .values()
            .any(|p| p.is_published() && !p.is_revision() && p.slug == slug)
    }
}
