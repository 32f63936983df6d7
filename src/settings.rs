// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Runtime settings store.
//!
//! One [`SettingsHandle`] is built at startup and shared through the
//! application state. Readers take a cheap snapshot per request; writers
//! go through [`SettingsValidator`] and, when a file is configured, the
//! result is persisted as JSON.

use crate::config::Settings;
use crate::validator::{SettingsUpdate, SettingsValidator, ValidationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to persist settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared handle to the current settings.
pub struct SettingsHandle {
    current: RwLock<Arc<Settings>>,
    path: Option<PathBuf>,
    validator: SettingsValidator,
}

impl SettingsHandle {
    /// In-memory settings store.
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
            path: None,
            validator: SettingsValidator::new(),
        }
    }

    /// File-backed store. A stored file wins over `fallback`; a file that is
    /// unreadable or fails validation is logged and `fallback` is used.
    pub async fn open(path: impl AsRef<Path>, fallback: Settings) -> Self {
        let path = path.as_ref().to_path_buf();
        let validator = SettingsValidator::new();

        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Settings>(&bytes) {
                Ok(stored) => match validator.check(&stored) {
                    Ok(checked) => {
                        info!(path = %path.display(), "Loaded stored settings");
                        checked
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Ignoring invalid settings file");
                        fallback
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
                    fallback
                }
            },
            Err(_) => fallback,
        };

        Self {
            current: RwLock::new(Arc::new(settings)),
            path: Some(path),
            validator,
        }
    }

    /// Current settings.
    pub async fn snapshot(&self) -> Arc<Settings> {
        self.current.read().await.clone()
    }

    /// Validate and apply a partial update, returning the new settings.
    pub async fn update(&self, update: SettingsUpdate) -> Result<Arc<Settings>, SettingsError> {
        let mut current = self.current.write().await;
        let next = Arc::new(self.validator.apply(&current, update)?);

        if let Some(path) = &self.path {
            let encoded = serde_json::to_vec_pretty(next.as_ref())?;
            tokio::fs::write(path, encoded).await?;
        }

        *current = next.clone();
        info!("Settings updated");
        Ok(next)
    }
}
