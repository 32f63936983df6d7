// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for gateway decisions.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    /// Redirect decisions by kind (`permanent`, `holding`, `not_found`)
    pub redirects: IntCounterVec,
    /// Requests rejected by the rate limiter
    pub rate_limited: IntCounter,
    /// Webhook deliveries by event and outcome
    pub webhooks: IntCounterVec,
    /// Cross-origin requests from origins outside the allow-list
    pub cors_rejected: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let redirects = IntCounterVec::new(
            Opts::new("headless_redirects_total", "Redirect decisions by kind"),
            &["kind"],
        )?;
        let rate_limited = IntCounter::new(
            "headless_rate_limited_total",
            "Requests rejected by the rate limiter",
        )?;
        let webhooks = IntCounterVec::new(
            Opts::new("headless_webhooks_total", "Webhook deliveries by event and outcome"),
            &["event", "outcome"],
        )?;
        let cors_rejected = IntCounter::new(
            "headless_cors_rejected_total",
            "Cross-origin requests from origins outside the allow-list",
        )?;

        registry.register(Box::new(redirects.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;
        registry.register(Box::new(webhooks.clone()))?;
        registry.register(Box::new(cors_rejected.clone()))?;

        Ok(Self {
            registry,
            redirects,
            rate_limited,
            webhooks,
            cors_rejected,
        })
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
