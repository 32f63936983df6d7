// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the headless gateway.
//!
//! Errors render in the shape REST clients of the CMS already understand:
//! `{"code": "...", "message": "...", "data": {"status": N}}`.

use crate::validator::ValidationError;
use crate::webhook::WebhookError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Invalid parameter(s): {0}")]
    InvalidParam(String),

    #[error("Sorry, you are not allowed to do that.")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    pub data: ErrorData,
}

#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub status: u16,
}

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. } => code,
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::InvalidParam(_) => "rest_invalid_param",
            Self::Unauthorized => "rest_forbidden",
            Self::Validation(_) => "invalid_setting",
            Self::Webhook(WebhookError::NotConfigured) => "webhook_not_configured",
            Self::Webhook(_) => "webhook_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidParam(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Webhook(WebhookError::NotConfigured) => StatusCode::BAD_REQUEST,
            Self::Webhook(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            data: ErrorData {
                status: status.as_u16(),
            },
        });

        match self {
            Self::RateLimitExceeded { retry_after } => (
                status,
                [(header::RETRY_AFTER, retry_after.as_secs().max(1).to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        let err = AppError::not_found("menu_not_found", "Menu location not found");
        assert_eq!(err.code(), "menu_not_found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Menu location not found");

        let err = AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(12),
        };
        assert_eq!(err.code(), "rate_limit_exceeded");
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let err = AppError::from(WebhookError::NotConfigured);
        assert_eq!(err.code(), "webhook_not_configured");
    }

    #[test]
    fn test_rate_limit_response_carries_retry_after() {
        let response = AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(30),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }
}
