// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Traffic simulations against the rate-limited REST surface.
//!
//! These drive the full router with many simulated clients and check
//! that the fixed window holds under sustained and concurrent load.

mod harness;

use axum::{http::StatusCode, Router};
use harness::{
    fixtures::{self, from_peer, get, send},
    generators,
    metrics::{Outcome, TrafficMetrics},
};
use headless_gateway::Settings;
use std::net::SocketAddr;
use std::time::Duration;

fn limited(per_minute: u32) -> Settings {
    Settings {
        rate_limiting_enabled: true,
        rate_limit_per_minute: per_minute,
        ..fixtures::no_redirect()
    }
}

async fn hit(app: &Router, path: &str, peer: SocketAddr) -> Outcome {
    match send(app, from_peer(get(path), peer)).await.status() {
        StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
        s if s.is_success() => Outcome::Allowed,
        _ => Outcome::Other,
    }
}

/// Send `per_client` requests from each peer, interleaving clients.
async fn run_traffic(app: &Router, peers: &[SocketAddr], per_client: usize) -> TrafficMetrics {
    let paths = generators::generate_api_paths();
    let mut metrics = TrafficMetrics::new();
    metrics.start();

    for round in 0..per_client {
        for peer in peers {
            let outcome = hit(app, paths[round % paths.len()], *peer).await;
            metrics.record(outcome, &peer.ip().to_string());
        }
    }

    metrics.finish();
    metrics
}

#[tokio::test(start_paused = true)]
async fn test_single_client_flood() {
    let (app, _) = fixtures::app(limited(60));
    let peers = generators::generate_peers(1);

    let metrics = run_traffic(&app, &peers, 200).await;
    println!("{metrics}");

    assert_eq!(metrics.count(Outcome::Allowed), 60);
    assert_eq!(metrics.count(Outcome::RateLimited), 140);
    assert_eq!(metrics.count(Outcome::Other), 0);
    assert!(metrics.block_rate() > 0.69);
}

#[tokio::test(start_paused = true)]
async fn test_distributed_clients_each_get_their_quota() {
    let (app, state) = fixtures::app(limited(20));
    let peers = generators::generate_peers(50);

    let metrics = run_traffic(&app, &peers, 25).await;
    println!("{metrics}");

    assert_eq!(metrics.total_requests(), 50 * 25);
    assert_eq!(metrics.clients_served(), 50);
    assert_eq!(metrics.max_allowed_per_client(), 20);
    assert_eq!(metrics.count(Outcome::Allowed), 50 * 20);
    assert_eq!(metrics.count(Outcome::RateLimited), 50 * 5);
    assert_eq!(state.limiter.tracked_clients().await, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_from_one_client() {
    let (app, state) = fixtures::app(limited(60));
    let peer = generators::generate_peers(1)[0];

    let handles: Vec<_> = (0..150)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { hit(&app, "/wp-json/wp/v2/posts", peer).await })
        })
        .collect();

    let mut metrics = TrafficMetrics::new();
    for handle in handles {
        metrics.record(handle.await.unwrap(), &peer.ip().to_string());
    }

    assert_eq!(metrics.count(Outcome::Allowed), 60);
    assert_eq!(metrics.count(Outcome::RateLimited), 90);
    assert_eq!(state.limiter.current_count(peer.ip()).await, 60);
}

#[tokio::test(start_paused = true)]
async fn test_sustained_traffic_across_windows() {
    let (app, state) = fixtures::app(limited(10));
    let peers = generators::generate_peers(3);
    let mut total = TrafficMetrics::new();

    for _ in 0..3 {
        let window = run_traffic(&app, &peers, 15).await;
        assert_eq!(window.max_allowed_per_client(), 10);
        for _ in 0..window.count(Outcome::Allowed) {
            total.record(Outcome::Allowed, "all");
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        state.limiter.cleanup().await;
        assert_eq!(state.limiter.tracked_clients().await, 0);
    }

    assert_eq!(total.count(Outcome::Allowed), 3 * 3 * 10);
}

#[tokio::test]
async fn test_unlimited_when_disabled() {
    let (app, _) = fixtures::app(fixtures::no_redirect());
    let peers = generators::generate_peers(2);

    let metrics = run_traffic(&app, &peers, 100).await;

    assert_eq!(metrics.count(Outcome::RateLimited), 0);
    assert_eq!(metrics.count(Outcome::Allowed), 200);
    assert!(metrics.duration() > Duration::ZERO);
}
