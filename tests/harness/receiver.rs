// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Local webhook receiver that records every delivery.

use axum::{body::Bytes, http::HeaderMap, http::StatusCode, routing::post, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Delivery {
    pub signature: Option<String>,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub body: Bytes,
}

impl Delivery {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct Receiver {
    pub url: String,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
}

impl Receiver {
    /// Start a receiver answering every POST with `status` and `reply`.
    pub async fn start(status: StatusCode, reply: &'static str) -> Self {
        Self::start_delayed(status, reply, Duration::ZERO).await
    }

    /// Like [`Receiver::start`], but each answer is held back for `delay`.
    pub async fn start_delayed(status: StatusCode, reply: &'static str, delay: Duration) -> Self {
        let (tx, deliveries) = mpsc::unbounded_channel();

        let app = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, body: Bytes| {
                let tx = tx.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    let _ = tx.send(Delivery {
                        signature: header("x-webhook-signature"),
                        content_type: header("content-type"),
                        user_agent: header("user-agent"),
                        body,
                    });
                    tokio::time::sleep(delay).await;
                    (status, reply)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/hook"),
            deliveries,
        }
    }

    /// Next delivery, or `None` if nothing arrives within `wait`.
    pub async fn next(&mut self, wait: Duration) -> Option<Delivery> {
        tokio::time::timeout(wait, self.deliveries.recv())
            .await
            .ok()
            .flatten()
    }
}

/// A URL nothing is listening on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/hook")
}
