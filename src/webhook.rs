// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound webhooks for content changes.
//!
//! Content lifecycle events are turned into a JSON payload, signed with
//! HMAC-SHA256 when a secret is configured, and POSTed to the configured
//! URL from a detached task. Nothing awaits that task and its failures
//! are only logged: saving or deleting content never fails because the
//! receiver is down.
//!
//! The admin test path is the exception. It sends a fixed payload, waits
//! up to [`TEST_TIMEOUT`] (unless overridden with
//! [`WebhookDispatcher::with_timeouts`]) and reports the receiver's status and body, or
//! the transport error, to the caller.

use crate::config::Settings;
use crate::content::{ContentChange, Post, PostStatus};
use crate::metrics::Metrics;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Timeout for fire-and-forget deliveries.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the synchronous test delivery.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(15);

const TEST_MESSAGE: &str = "This is a test webhook from your CMS site";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook URL not configured")]
    NotConfigured,

    #[error("Webhook failed: {0}")]
    Transport(String),

    #[error("Failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PostCreated,
    PostUpdated,
    PostDeleted,
    CacheCleared,
    Test,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostCreated => "post_created",
            Self::PostUpdated => "post_updated",
            Self::PostDeleted => "post_deleted",
            Self::CacheCleared => "cache_cleared",
            Self::Test => "test",
        }
    }
}

/// Event record sent to the receiver. Built, sent and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: i64,
    pub site_url: String,
}

impl WebhookPayload {
    fn bare(event: EventKind, site_url: &str, timestamp: i64) -> Self {
        Self {
            event,
            post_id: None,
            post_type: None,
            post_title: None,
            post_url: None,
            message: None,
            timestamp,
            site_url: site_url.to_string(),
        }
    }

    /// Payload for a content change, or `None` when the change is not public:
    /// revisions, saves that leave the post unpublished, and deletions of
    /// posts that were never live.
    pub fn for_change(change: &ContentChange, site_url: &str, timestamp: i64) -> Option<Self> {
        let (event, post, with_url) = match change {
            ContentChange::Saved { post, updated } => {
                if post.is_revision() || post.status != PostStatus::Publish {
                    return None;
                }
                let event = if *updated {
                    EventKind::PostUpdated
                } else {
                    EventKind::PostCreated
                };
                (event, post, true)
            }
            ContentChange::Deleted { post } => {
                if post.is_revision() || !post.status.was_public() {
                    return None;
                }
                (EventKind::PostDeleted, post, false)
            }
        };

        Some(Self::for_post(event, post, site_url, timestamp, with_url))
    }

    fn for_post(
        event: EventKind,
        post: &Post,
        site_url: &str,
        timestamp: i64,
        with_url: bool,
    ) -> Self {
        Self {
            post_id: Some(post.id),
            post_type: Some(post.post_type.clone()),
            post_title: Some(post.title.clone()),
            post_url: with_url.then(|| post.permalink(site_url)),
            ..Self::bare(event, site_url, timestamp)
        }
    }

    pub fn cache_cleared(site_url: &str, timestamp: i64) -> Self {
        Self::bare(EventKind::CacheCleared, site_url, timestamp)
    }

    pub fn test(site_url: &str, timestamp: i64) -> Self {
        Self {
            message: Some(TEST_MESSAGE.to_string()),
            ..Self::bare(EventKind::Test, site_url, timestamp)
        }
    }
}

/// `sha256=<hex>` HMAC of `body`, or `None` for an empty secret.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// A payload serialized once, with the signature over exactly those bytes.
#[derive(Debug, Clone)]
pub struct PreparedWebhook {
    pub url: String,
    pub event: EventKind,
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

impl PreparedWebhook {
    pub fn new(settings: &Settings, payload: &WebhookPayload) -> Result<Self, WebhookError> {
        if !settings.webhook_configured() {
            return Err(WebhookError::NotConfigured);
        }
        let body = serde_json::to_vec(payload)?;
        let signature = sign(&settings.webhook_secret, &body);
        Ok(Self {
            url: settings.webhook_url.clone(),
            event: payload.event,
            body,
            signature,
        })
    }

    fn request(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut request = client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(signature) = self.signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.body(self.body)
    }
}

/// What the receiver said to a test delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookTestOutcome {
    pub status_code: u16,
    pub response: String,
    pub success: bool,
}

pub struct WebhookDispatcher {
    client: reqwest::Client,
    test_client: reqwest::Client,
    test_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl WebhookDispatcher {
    /// Dispatcher with the default [`DISPATCH_TIMEOUT`] and [`TEST_TIMEOUT`].
    pub fn new(metrics: Arc<Metrics>) -> Result<Self, WebhookError> {
        Self::with_timeouts(metrics, DISPATCH_TIMEOUT, TEST_TIMEOUT)
    }

    pub fn with_timeouts(
        metrics: Arc<Metrics>,
        dispatch: Duration,
        test: Duration,
    ) -> Result<Self, WebhookError> {
        let user_agent = concat!("headless-gateway/", env!("CARGO_PKG_VERSION"));
        let build = |timeout| {
            reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .map_err(|e| WebhookError::Client(e.to_string()))
        };

        Ok(Self {
            client: build(dispatch)?,
            test_client: build(test)?,
            test_timeout: test,
            metrics,
        })
    }

    /// Send `payload` from a detached task. Returns immediately; the outcome
    /// is logged and counted, never returned.
    pub fn dispatch(&self, settings: &Settings, payload: WebhookPayload) {
        let prepared = match PreparedWebhook::new(settings, &payload) {
            Ok(prepared) => prepared,
            Err(WebhookError::NotConfigured) => return,
            Err(e) => {
                warn!(event = payload.event.as_str(), error = %e, "Dropping webhook");
                return;
            }
        };

        let client = self.client.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let event = prepared.event.as_str();
            let outcome = match prepared.request(&client).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(event, status = %response.status(), "Webhook delivered");
                    "sent"
                }
                Ok(response) => {
                    warn!(event, status = %response.status(), "Webhook rejected by receiver");
                    "rejected"
                }
                Err(e) => {
                    warn!(event, error = %e, "Webhook delivery failed");
                    "failed"
                }
            };
            metrics.webhooks.with_label_values(&[event, outcome]).inc();
        });
    }

    /// Notify the receiver of a content change, if it is a public one.
    pub fn notify_change(&self, settings: &Settings, change: &ContentChange, site_url: &str) {
        let timestamp = chrono::Utc::now().timestamp();
        match WebhookPayload::for_change(change, site_url, timestamp) {
            Some(payload) => self.dispatch(settings, payload),
            None => debug!(post_id = change.post().id, "Skipping webhook for non-public change"),
        }
    }

    /// Send the test payload and wait for the receiver's answer.
    pub async fn send_test(
        &self,
        settings: &Settings,
        site_url: &str,
    ) -> Result<WebhookTestOutcome, WebhookError> {
        let payload = WebhookPayload::test(site_url, chrono::Utc::now().timestamp());
        let prepared = PreparedWebhook::new(settings, &payload)?;

        let response = match prepared.request(&self.test_client).send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.webhooks.with_label_values(&["test", "failed"]).inc();
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", self.test_timeout)
                } else {
                    e.to_string()
                };
                return Err(WebhookError::Transport(reason));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;

        let outcome = if status.is_success() { "sent" } else { "rejected" };
        self.metrics.webhooks.with_label_values(&["test", outcome]).inc();
        info!(status = %status, "Test webhook answered");

        Ok(WebhookTestOutcome {
            status_code: status.as_u16(),
            response: body,
            success: status.is_success(),
        })
    }
}
