//! Collaborator seams.
//!
//! The engine never parses file formats. Rule documents arrive through a
//! [`ConfigProvider`] and per-environment settings through a
//! [`SettingsLoader`]; whether the source was JSON or YAML, schema-checked
//! or not, is the collaborator's concern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::schema::Config;
use crate::error::{ConfigLoadError, SettingsError};

/// A settings document reduced to colon-joined keys.
pub type FlattenedSettings = HashMap<String, Value>;

/// Supplies the rule document for an invocation.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Loads the rule document located at `config_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] when the document is missing or unusable.
    async fn load_config(&self, config_path: &str) -> Result<Config, ConfigLoadError>;
}

/// Supplies the flattened settings for one environment.
#[async_trait]
pub trait SettingsLoader: Send + Sync {
    /// Loads and flattens the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Critical`] for process-fatal failures and the
    /// other variants for recoverable ones.
    async fn load_settings(&self, path: &Path) -> Result<FlattenedSettings, SettingsError>;
}

/// Serves one already-loaded rule document regardless of the requested path.
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    config: Arc<Config>,
}

impl StaticConfigProvider {
    /// Wraps a loaded document.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn load_config(&self, _config_path: &str) -> Result<Config, ConfigLoadError> {
        Ok(Config::clone(&self.config))
    }
}

/// Serves settings maps registered by path.
///
/// Useful for embedding hosts that have already parsed their settings and
/// for tests. Unregistered paths report [`SettingsError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsLoader {
    files: HashMap<PathBuf, FlattenedSettings>,
}

impl InMemorySettingsLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the settings served for `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, settings: FlattenedSettings) -> Self {
        self.files.insert(path.into(), settings);
        self
    }
}

#[async_trait]
impl SettingsLoader for InMemorySettingsLoader {
    async fn load_settings(&self, path: &Path) -> Result<FlattenedSettings, SettingsError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SettingsError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
