//! Shared integration-test harness: temp-directory fixtures plus file-backed
//! collaborators that parse JSON or YAML the way a real host would.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use settings_guard::config::{ConfigProvider, FlattenedSettings, SettingsLoader};
use settings_guard::error::{ConfigLoadError, CriticalError, CriticalKind, SettingsError};
use settings_guard::{Config, EngineOptions, RuleEngine, ValidatorCatalog};

/// A temporary project directory holding a rule document and settings files.
pub struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().canonicalize().expect("temp dir should canonicalize");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes `value` as pretty JSON at `relative`, creating parent dirs.
    #[allow(clippy::missing_panics_doc)]
    pub fn write_json(&self, relative: &str, value: &Value) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
        path
    }

    /// Writes `value` as YAML at `relative`.
    #[allow(clippy::missing_panics_doc)]
    pub fn write_yaml(&self, relative: &str, value: &Value) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, serde_yaml::to_string(value).unwrap()).unwrap();
        path
    }

    /// Writes the rule document and returns its path as a string.
    pub fn write_rules(&self, document: &Value) -> String {
        self.write_json("rules.json", document).display().to_string()
    }
}

/// Rule document with one environment per `(id, path)` and a single rule
/// requiring `Db:Host` in all of them.
pub fn rules_document(environments: &[(&str, &str)]) -> Value {
    let envs: Vec<Value> = environments
        .iter()
        .map(|(id, path)| json!({"id": id, "name": id.to_uppercase(), "path": path}))
        .collect();
    let ids: Vec<&str> = environments.iter().map(|(id, _)| *id).collect();
    json!({
        "version": "1",
        "environments": envs,
        "rules": [{
            "id": "database",
            "environments": ids,
            "rule": {
                "id": "database-detail",
                "conditions": [{
                    "key": "Db:Host",
                    "condition": [{"validator": "required", "message": "Db:Host is required"}]
                }]
            }
        }]
    })
}

/// Reads rule documents from disk (JSON, or YAML by extension).
#[derive(Debug, Default)]
pub struct FileConfigProvider;

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self, config_path: &str) -> Result<Config, ConfigLoadError> {
        let raw = tokio::fs::read_to_string(config_path)
            .await
            .map_err(|_| ConfigLoadError::NotFound(config_path.to_string()))?;
        parse_document(Path::new(config_path), &raw)
            .and_then(|value| serde_json::from_value(value).map_err(|e| e.to_string()))
            .map_err(ConfigLoadError::Invalid)
    }
}

/// Reads settings files from disk and flattens them into colon-joined keys.
///
/// Files whose name is listed in `critical` fail with an out-of-memory
/// critical error instead of loading; files listed in `panicking` panic.
#[derive(Debug, Default)]
pub struct FileSettingsLoader {
    critical: HashSet<String>,
    panicking: HashSet<String>,
}

impl FileSettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_critical(mut self, file_name: &str) -> Self {
        self.critical.insert(file_name.to_string());
        self
    }

    pub fn with_panic(mut self, file_name: &str) -> Self {
        self.panicking.insert(file_name.to_string());
        self
    }
}

#[async_trait]
impl SettingsLoader for FileSettingsLoader {
    async fn load_settings(&self, path: &Path) -> Result<FlattenedSettings, SettingsError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(
            !self.panicking.contains(&name),
            "settings loader crashed on {name}"
        );
        if self.critical.contains(&name) {
            return Err(SettingsError::Critical(CriticalError::new(
                CriticalKind::OutOfMemory,
                format!("allocation failed while reading {name}"),
            )));
        }

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SettingsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(SettingsError::Invalid {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };

        let document = parse_document(path, &raw).map_err(|message| SettingsError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        let mut flat = FlattenedSettings::new();
        flatten("", &document, &mut flat);
        Ok(flat)
    }
}

fn parse_document(path: &Path, raw: &str) -> Result<Value, String> {
    let is_yaml = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

/// Flattens nested objects and arrays into `Parent:Child` / `List:0` keys.
pub fn flatten(prefix: &str, value: &Value, out: &mut FlattenedSettings) {
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{prefix}:{segment}")
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(&join(k), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&join(&i.to_string()), v, out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.clone());
        }
    }
}

/// Engine over the file-backed collaborators with the built-in catalog.
pub fn engine(loader: FileSettingsLoader, options: EngineOptions) -> RuleEngine {
    RuleEngine::new(
        Arc::new(FileConfigProvider),
        Arc::new(loader),
        Arc::new(ValidatorCatalog::builtin()),
        options,
    )
}
