// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Settings validator.
//!
//! Everything an administrator submits passes through here before it
//! reaches the settings store:
//! - URL well-formedness (http/https with a host)
//! - Boolean coercion of form-style values
//! - Non-negative integers and the holding-page delay range
//! - Origin allow-list entries
//!
//! Policies downstream assume well-typed settings and never re-validate.

use crate::config::Settings;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Upper bound for the holding page delay in seconds.
pub const MAX_REDIRECT_DELAY: f64 = 10.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL for {field}: {url}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("Invalid boolean for {field}: {value}")]
    InvalidBoolean { field: &'static str, value: String },

    #[error("Invalid number for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid origin in allowed_origins: {0}")]
    InvalidOrigin(String),
}

/// A submitted form value. Admin forms send booleans and numbers as
/// strings as often as native JSON values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for FormValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub frontend_url: Option<String>,
    pub redirect_enabled: Option<FormValue>,
    pub redirect_delay: Option<FormValue>,
    pub cors_enabled: Option<FormValue>,
    pub allowed_origins: Option<String>,
    pub cors_credentials: Option<FormValue>,
    pub security_headers: Option<FormValue>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub cache_enabled: Option<FormValue>,
    pub post_cache_time: Option<FormValue>,
    pub menu_cache_time: Option<FormValue>,
    pub rate_limiting_enabled: Option<FormValue>,
    pub rate_limit_per_minute: Option<FormValue>,
}

/// Settings validator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn new() -> Self {
        Self
    }

    /// Apply `update` on top of `current`, validating every submitted field.
    pub fn apply(
        &self,
        current: &Settings,
        update: SettingsUpdate,
    ) -> Result<Settings, ValidationError> {
        let mut next = current.clone();

        if let Some(url) = update.frontend_url {
            next.frontend_url = self.validate_url("frontend_url", &url)?;
        }
        if let Some(v) = update.redirect_enabled {
            next.redirect_enabled = coerce_bool("redirect_enabled", &v)?;
        }
        if let Some(v) = update.redirect_delay {
            next.redirect_delay = self.validate_delay(&v)?;
        }
        if let Some(v) = update.cors_enabled {
            next.cors_enabled = coerce_bool("cors_enabled", &v)?;
        }
        if let Some(origins) = update.allowed_origins {
            next.allowed_origins = self.validate_origins(&origins)?;
        }
        if let Some(v) = update.cors_credentials {
            next.cors_credentials = coerce_bool("cors_credentials", &v)?;
        }
        if let Some(v) = update.security_headers {
            next.security_headers = coerce_bool("security_headers", &v)?;
        }
        if let Some(url) = update.webhook_url {
            next.webhook_url = self.validate_url("webhook_url", &url)?;
        }
        if let Some(secret) = update.webhook_secret {
            next.webhook_secret = sanitize_text(&secret);
        }
        if let Some(v) = update.cache_enabled {
            next.cache_enabled = coerce_bool("cache_enabled", &v)?;
        }
        if let Some(v) = update.post_cache_time {
            next.post_cache_time = parse_unsigned("post_cache_time", &v)?;
        }
        if let Some(v) = update.menu_cache_time {
            next.menu_cache_time = parse_unsigned("menu_cache_time", &v)?;
        }
        if let Some(v) = update.rate_limiting_enabled {
            next.rate_limiting_enabled = coerce_bool("rate_limiting_enabled", &v)?;
        }
        if let Some(v) = update.rate_limit_per_minute {
            let limit = parse_unsigned("rate_limit_per_minute", &v)?;
            if limit == 0 || limit > u32::MAX as u64 {
                return Err(ValidationError::OutOfRange {
                    field: "rate_limit_per_minute",
                    value: limit.to_string(),
                    expected: "at least 1",
                });
            }
            next.rate_limit_per_minute = limit as u32;
        }

        Ok(next)
    }

    /// Validate a complete settings value, such as one loaded from the
    /// environment or a stored file, and return its normalized form.
    pub fn check(&self, settings: &Settings) -> Result<Settings, ValidationError> {
        if settings.rate_limit_per_minute == 0 {
            return Err(ValidationError::OutOfRange {
                field: "rate_limit_per_minute",
                value: "0".to_string(),
                expected: "at least 1",
            });
        }

        Ok(Settings {
            frontend_url: self.validate_url("frontend_url", &settings.frontend_url)?,
            redirect_delay: delay_in_range(settings.redirect_delay, || {
                settings.redirect_delay.to_string()
            })?,
            allowed_origins: self.validate_origins(&settings.allowed_origins)?,
            webhook_url: self.validate_url("webhook_url", &settings.webhook_url)?,
            webhook_secret: sanitize_text(&settings.webhook_secret),
            ..settings.clone()
        })
    }

    /// Validate a URL setting and return its normalized serialization.
    /// Empty clears it.
    pub fn validate_url(&self, field: &'static str, url: &str) -> Result<String, ValidationError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }

        let invalid = || ValidationError::InvalidUrl {
            field,
            url: trimmed.to_string(),
        };

        let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            debug!(field, url = %trimmed, "Rejected URL setting");
            return Err(invalid());
        }

        Ok(parsed.into())
    }

    /// Validate the holding page delay: 0 to 10 seconds in half-second steps.
    pub fn validate_delay(&self, value: &FormValue) -> Result<f64, ValidationError> {
        let delay = parse_float("redirect_delay", value)?;
        delay_in_range(delay, || value.to_string())
    }

    /// Validate the allow-list, normalizing each entry to its serialized origin.
    pub fn validate_origins(&self, origins: &str) -> Result<String, ValidationError> {
        let mut normalized = Vec::new();

        for line in sanitize_multiline(origins).lines() {
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }

            let parsed =
                Url::parse(entry).map_err(|_| ValidationError::InvalidOrigin(entry.to_string()))?;
            let bare = parsed.path() == "/" && parsed.query().is_none() && parsed.fragment().is_none();
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() || !bare
            {
                return Err(ValidationError::InvalidOrigin(entry.to_string()));
            }

            normalized.push(parsed.origin().ascii_serialization());
        }

        Ok(normalized.join("\n"))
    }
}

fn delay_in_range(delay: f64, shown: impl FnOnce() -> String) -> Result<f64, ValidationError> {
    if !(0.0..=MAX_REDIRECT_DELAY).contains(&delay) || (delay * 2.0).fract() != 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "redirect_delay",
            value: shown(),
            expected: "0 to 10 in steps of 0.5",
        });
    }
    Ok(delay)
}

/// Coerce a form value into a boolean.
pub fn coerce_bool(field: &'static str, value: &FormValue) -> Result<bool, ValidationError> {
    let invalid = || ValidationError::InvalidBoolean {
        field,
        value: value.to_string(),
    };

    match value {
        FormValue::Bool(b) => Ok(*b),
        FormValue::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid()),
        },
        FormValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "" | "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(invalid()),
        },
    }
}

fn parse_unsigned(field: &'static str, value: &FormValue) -> Result<u64, ValidationError> {
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    match value {
        FormValue::Number(n) => n.as_u64().ok_or_else(invalid),
        FormValue::Text(s) => s.trim().parse::<u64>().map_err(|_| invalid()),
        FormValue::Bool(_) => Err(invalid()),
    }
}

fn parse_float(field: &'static str, value: &FormValue) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    let parsed = match value {
        FormValue::Number(n) => n.as_f64().ok_or_else(invalid)?,
        FormValue::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        FormValue::Bool(_) => return Err(invalid()),
    };

    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(invalid())
    }
}

/// Single-line text: control characters removed, surrounding whitespace trimmed.
fn sanitize_text(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_string()
}

/// Multi-line text: like [`sanitize_text`] but newlines survive.
fn sanitize_multiline(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect()
}
