// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the headless gateway.
//!
//! Two layers live here:
//!
//! - [`Config`]: process-level settings fixed at startup (bind address,
//!   site identity, file locations, metrics).
//! - [`Settings`]: the runtime options an administrator edits. Defaults
//!   mirror the options registered by the CMS theme this service fronts.

use crate::validator::SettingsValidator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the headless gateway service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Site identity reported by `site-info` and used in webhook payloads
    #[serde(default)]
    pub site: SiteConfig,

    /// Where runtime settings are persisted (JSON). In-memory only when unset.
    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    /// JSON document used to seed the content repository
    #[serde(default)]
    pub content_file: Option<PathBuf>,

    /// Bearer token required on `/admin` routes. Routes are open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Initial runtime settings
    #[serde(default)]
    pub settings: Settings,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public URL of the CMS itself (default: http://localhost:8080)
    #[serde(default = "default_site_url")]
    pub url: String,

    #[serde(default = "default_site_name")]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_time_format")]
    pub time_format: String,
}

/// Runtime options, edited through the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// External frontend the CMS redirects visitors to. Empty disables redirects.
    #[serde(default)]
    pub frontend_url: String,

    #[serde(default = "default_true")]
    pub redirect_enabled: bool,

    /// Seconds before the holding page navigates away (0 = server redirect)
    #[serde(default)]
    pub redirect_delay: f64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Newline-separated origin allow-list. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: String,

    #[serde(default)]
    pub cors_credentials: bool,

    #[serde(default = "default_true")]
    pub security_headers: bool,

    #[serde(default)]
    pub webhook_url: String,

    #[serde(default)]
    pub webhook_secret: String,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache lifetime for posts/pages collections in seconds (default: 300)
    #[serde(default = "default_post_cache_time")]
    pub post_cache_time: u64,

    /// Cache lifetime for menu routes in seconds (default: 3600)
    #[serde(default = "default_menu_cache_time")]
    pub menu_cache_time: u64,

    #[serde(default)]
    pub rate_limiting_enabled: bool,

    /// Requests per client IP per 60-second window (default: 60)
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_site_name() -> String {
    "Headless Site".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_date_format() -> String {
    "F j, Y".to_string()
}

fn default_time_format() -> String {
    "g:i a".to_string()
}

fn default_post_cache_time() -> u64 {
    300
}

fn default_menu_cache_time() -> u64 {
    3600
}

fn default_rate_limit_per_minute() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            site: SiteConfig::default(),
            settings_file: None,
            content_file: None,
            admin_token: None,
            settings: Settings::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            name: default_site_name(),
            description: String::new(),
            language: default_language(),
            timezone: default_timezone(),
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frontend_url: String::new(),
            redirect_enabled: default_true(),
            redirect_delay: 0.0,
            cors_enabled: default_true(),
            allowed_origins: String::new(),
            cors_credentials: false,
            security_headers: default_true(),
            webhook_url: String::new(),
            webhook_secret: String::new(),
            cache_enabled: default_true(),
            post_cache_time: default_post_cache_time(),
            menu_cache_time: default_menu_cache_time(),
            rate_limiting_enabled: false,
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Settings {
    /// Parse the multi-line allow-list into a set of origins.
    ///
    /// An empty set means every origin is allowed, not that none is.
    pub fn allowed_origin_set(&self) -> BTreeSet<String> {
        self.allowed_origins
            .lines()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Holding page delay as a duration.
    pub fn redirect_delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.redirect_delay.max(0.0)).unwrap_or_default()
    }

    pub fn webhook_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }
}

impl Config {
    /// Load configuration from `.env`, an optional config file and
    /// `HEADLESS_*` environment variables, in increasing precedence.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `HEADLESS_SETTINGS__FRONTEND_URL`.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var("HEADLESS_CONFIG").unwrap_or_else(|_| "headless".to_string());

        let source = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("HEADLESS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_source(source)
    }

    /// Deserialize a built source and run the initial settings through
    /// [`SettingsValidator`]. Invalid settings fail startup.
    pub fn from_source(source: config::Config) -> Result<Self, config::ConfigError> {
        let mut loaded: Config = source.try_deserialize()?;
        loaded.settings = SettingsValidator::new()
            .check(&loaded.settings)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_match_theme_options() {
        let settings = Settings::default();
        assert!(settings.redirect_enabled);
        assert_eq!(settings.redirect_delay, 0.0);
        assert!(settings.cors_enabled);
        assert!(!settings.cors_credentials);
        assert!(settings.cache_enabled);
        assert_eq!(settings.post_cache_time, 300);
        assert_eq!(settings.menu_cache_time, 3600);
        assert!(!settings.rate_limiting_enabled);
        assert_eq!(settings.rate_limit_per_minute, 60);
    }

    #[test]
    fn test_allowed_origin_set_trims_and_drops_empties() {
        let settings = Settings {
            allowed_origins: "https://a.com\n\n  https://b.com  \r\n   \n".to_string(),
            ..Default::default()
        };
        let set = settings.allowed_origin_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("https://a.com"));
        assert!(set.contains("https://b.com"));
    }

    #[test]
    fn test_blank_allowed_origins_is_empty_set() {
        let settings = Settings {
            allowed_origins: " \n \n".to_string(),
            ..Default::default()
        };
        assert!(settings.allowed_origin_set().is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"frontend_url":"https://app.example.com"}"#).unwrap();
        assert_eq!(settings.frontend_url, "https://app.example.com");
        assert!(settings.redirect_enabled);
        assert_eq!(settings.rate_limit_per_minute, 60);
    }

    fn toml(text: &str) -> config::Config {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn test_oversized_delay_does_not_panic() {
        let settings = Settings {
            redirect_delay: 1e20,
            ..Default::default()
        };
        assert_eq!(settings.redirect_delay_duration(), Duration::ZERO);

        let settings = Settings {
            redirect_delay: 2.5,
            ..Default::default()
        };
        assert_eq!(settings.redirect_delay_duration(), Duration::from_millis(2500));
    }

    #[test]
    fn test_loaded_settings_are_normalized() {
        let config = Config::from_source(toml(
            r#"
            [settings]
            frontend_url = " https://app.example.com "
            redirect_delay = 2.5
            "#,
        ))
        .unwrap();
        assert_eq!(config.settings.frontend_url, "https://app.example.com/");
        assert_eq!(config.settings.redirect_delay, 2.5);
    }

    #[test]
    fn test_invalid_loaded_settings_fail_startup() {
        for bad in [
            r#"frontend_url = "app.example.com""#,
            "rate_limit_per_minute = 0",
            "redirect_delay = 3.7",
            "redirect_delay = 1e20",
        ] {
            let result = Config::from_source(toml(&format!("[settings]\n{bad}")));
            assert!(
                matches!(result, Err(config::ConfigError::Message(_))),
                "{bad} should be rejected"
            );
        }
    }
}
