// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for the REST API.
//!
//! Each client IP gets a counter keyed by a hash of its address. The
//! counter lives for one 60-second window from the first request in it,
//! then resets to zero. Bursts straddling a window boundary can reach
//! twice the limit; that is accepted.
//!
//! The read-compare-increment sequence runs under a single write lock, so
//! concurrent requests from one client cannot overshoot the limit.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_secs(60);

const KEY_PREFIX: &str = "headless_rate_limit_";

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Counter for one client within its current window.
#[derive(Debug)]
struct Window {
    count: u32,
    expires_at: Instant,
}

/// Thread-safe fixed-window rate limiter.
pub struct RateLimiter {
    window: Duration,
    counters: Arc<RwLock<HashMap<String, Window>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a limiter with the standard 60-second window.
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Counter key for a client. The raw address is never stored.
    pub fn client_key(ip: IpAddr) -> String {
        let digest = Sha256::digest(ip.to_string().as_bytes());
        format!("{KEY_PREFIX}{}", hex::encode(&digest[..16]))
    }

    /// Count a request from `ip` against `limit` requests per window.
    ///
    /// A request over the limit is rejected without being counted.
    pub async fn check(&self, ip: IpAddr, limit: u32) -> RateLimitResult {
        let key = Self::client_key(ip);
        let now = Instant::now();

        let mut counters = self.counters.write().await;
        let window = counters.entry(key).or_insert_with(|| Window {
            count: 0,
            expires_at: now + self.window,
        });

        if now >= window.expires_at {
            window.count = 0;
            window.expires_at = now + self.window;
        }

        let reset_in = window.expires_at.saturating_duration_since(now);

        if window.count >= limit {
            debug!(%ip, count = window.count, limit, ?reset_in, "Rate limit exceeded");
            return RateLimitResult::Limited {
                retry_after: reset_in,
            };
        }

        window.count += 1;
        RateLimitResult::Allowed {
            remaining: limit - window.count,
            reset_in,
        }
    }

    /// Requests counted for `ip` in its current window.
    pub async fn current_count(&self, ip: IpAddr) -> u32 {
        let key = Self::client_key(ip);
        let counters = self.counters.read().await;
        match counters.get(&key) {
            Some(window) if Instant::now() < window.expires_at => window.count,
            _ => 0,
        }
    }

    /// Drop every counter. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut counters = self.counters.write().await;
        let removed = counters.len();
        counters.clear();
        removed
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        counters.retain(|_, window| now < window.expires_at);
    }

    pub async fn tracked_clients(&self) -> usize {
        self.counters.read().await.len()
    }
}
