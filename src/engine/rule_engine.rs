//! Rule engine orchestration.
//!
//! Per request the engine moves through
//! `config loaded → environment(s) selected → per environment {path resolved
//! → settings loaded → file validated} → aggregated`.
//!
//! Single-environment runs re-raise critical failures to the caller. Batch
//! runs capture them next to the other environments' results so one fatal
//! environment never hides the state of the rest.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::file_validator::validate_file;
use super::result::{FailureKind, FileValidationResult, RuleEngineResult, ValidationResults};
use crate::config::schema::{Config, Environment, Rule};
use crate::config::{ConfigProvider, EngineOptions, ExecutionMode, SecurityLimits, SettingsLoader};
use crate::error::{CriticalError, CriticalKind, EngineError, Result, SettingsError};
use crate::observability::metrics;
use crate::path::PathResolver;
use crate::plugins::StaticModuleLoader;
use crate::validators::ValidatorCatalog;

/// Validates environments of a rule document.
///
/// Cheap to share: every collaborator is held behind an `Arc`, and the only
/// mutable state is the path resolver's cache.
pub struct RuleEngine {
    config_provider: Arc<dyn ConfigProvider>,
    pipeline: Pipeline,
    execution: ExecutionMode,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("validators", &self.pipeline.catalog.len())
            .field("execution", &self.execution)
            .field("limits", &self.pipeline.limits)
            .finish_non_exhaustive()
    }
}

impl RuleEngine {
    /// Creates an engine around an existing validator catalog.
    ///
    /// `options.plugin_directories` is ignored here; the catalog is used as
    /// given.
    #[must_use]
    pub fn new(
        config_provider: Arc<dyn ConfigProvider>,
        settings_loader: Arc<dyn SettingsLoader>,
        catalog: Arc<ValidatorCatalog>,
        options: EngineOptions,
    ) -> Self {
        let resolver = Arc::new(PathResolver::new(&options.limits));
        Self {
            config_provider,
            pipeline: Pipeline {
                resolver,
                settings_loader,
                catalog,
                limits: Arc::new(options.limits),
            },
            execution: options.execution,
        }
    }

    /// Creates an engine whose catalog holds the built-ins plus every
    /// bundled plugin module found in `options.plugin_directories`.
    #[must_use]
    pub fn from_options(
        config_provider: Arc<dyn ConfigProvider>,
        settings_loader: Arc<dyn SettingsLoader>,
        options: EngineOptions,
    ) -> Self {
        let catalog = ValidatorCatalog::discover(
            &options.plugin_directories,
            &StaticModuleLoader::with_bundled(),
        );
        Self::new(config_provider, settings_loader, Arc::new(catalog), options)
    }

    /// The validator catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &ValidatorCatalog {
        &self.pipeline.catalog
    }

    /// Validates one environment.
    ///
    /// Recoverable problems (unknown environment, missing settings file,
    /// path escape) are reported through a failing [`RuleEngineResult`].
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidArgument`] for an empty `config_path` or
    ///   `environment_id`.
    /// - [`EngineError::Cancelled`] if `cancel` fires before the config is
    ///   loaded or before the environment pipeline starts.
    /// - [`EngineError::Critical`] if loading the settings failed with a
    ///   process-fatal error.
    pub async fn validate_environment(
        &self,
        config_path: &str,
        environment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RuleEngineResult> {
        require_non_empty("config path", config_path)?;
        require_non_empty("environment id", environment_id)?;

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "validate_environment",
            run_id = %run_id,
            config = config_path,
            environment = environment_id
        );

        self.run_single(config_path, environment_id, &run_id, cancel)
            .instrument(span)
            .await
    }

    async fn run_single(
        &self,
        config_path: &str,
        environment_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RuleEngineResult> {
        let config = match self.load_config(config_path, run_id, cancel).await? {
            ConfigLoad::Ready(config) => config,
            ConfigLoad::Rejected(result) => return Ok(result),
        };

        let Some(environment) = config.environment(environment_id).cloned() else {
            warn!("environment not found");
            return Ok(RuleEngineResult::error(
                run_id,
                FailureKind::Configuration,
                format!("Environment '{environment_id}' not found in configuration"),
            ));
        };

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let rules = config.rules_for(&environment.id);
        let base: Arc<str> = Arc::from(config_path);
        match self.pipeline.run(environment, rules, base).await {
            EnvironmentOutcome::Validated(file) => Ok(RuleEngineResult::single(run_id, file)),
            EnvironmentOutcome::Failed { file, kind } => {
                let message = file.error.clone().unwrap_or_default();
                Ok(RuleEngineResult::error(run_id, kind, message)
                    .with_results(ValidationResults::Single(file)))
            }
            EnvironmentOutcome::Critical { error, .. } => Err(EngineError::Critical(error)),
        }
    }

    /// Validates every environment declared in the rule document.
    ///
    /// Returns one entry per environment, sorted by path ignoring case.
    /// Critical failures are recorded in
    /// [`critical_errors`](RuleEngineResult::critical_errors) and the
    /// affected environment's entry is marked failed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidArgument`] for an empty `config_path`.
    /// - [`EngineError::Cancelled`] if `cancel` fires before the config is
    ///   loaded or before any environment pipeline starts. Pipelines that
    ///   already started are allowed to finish first.
    pub async fn validate_all_environments(
        &self,
        config_path: &str,
        cancel: &CancellationToken,
    ) -> Result<RuleEngineResult> {
        require_non_empty("config path", config_path)?;

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("validate_all_environments", run_id = %run_id, config = config_path);

        self.run_batch(config_path, &run_id, cancel)
            .instrument(span)
            .await
    }

    async fn run_batch(
        &self,
        config_path: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<RuleEngineResult> {
        let config = match self.load_config(config_path, run_id, cancel).await? {
            ConfigLoad::Ready(config) => config,
            ConfigLoad::Rejected(result) => return Ok(result),
        };

        let base: Arc<str> = Arc::from(config_path);
        let outcomes = match self.execution {
            ExecutionMode::Concurrent => self.run_concurrent(&config, &base, cancel).await?,
            ExecutionMode::Sequential => self.run_sequential(&config, &base, cancel).await?,
        };

        let mut files = Vec::with_capacity(outcomes.len());
        let mut critical_errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                EnvironmentOutcome::Validated(file) | EnvironmentOutcome::Failed { file, .. } => {
                    files.push(file);
                }
                EnvironmentOutcome::Critical { file, error } => {
                    files.push(file);
                    critical_errors.push(error);
                }
            }
        }

        files.sort_by_cached_key(|file| file.path.to_lowercase());

        info!(
            environments = files.len(),
            invalid = files.iter().filter(|f| !f.is_valid).count(),
            critical = critical_errors.len(),
            "batch validation complete"
        );

        Ok(RuleEngineResult::batch(run_id, files, critical_errors))
    }

    /// Loads the rule document and applies document-level checks.
    async fn load_config(
        &self,
        config_path: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigLoad> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let config = match self.config_provider.load_config(config_path).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "failed to load configuration");
                return Ok(ConfigLoad::Rejected(RuleEngineResult::error(
                    run_id,
                    FailureKind::Configuration,
                    e.to_string(),
                )));
            }
        };

        if let Err(violation) = self.pipeline.limits.check_config(&config) {
            warn!(error = %violation, "configuration exceeds security limits");
            metrics::record_security_denial("limit_exceeded");
            return Ok(ConfigLoad::Rejected(RuleEngineResult::error(
                run_id,
                FailureKind::Security,
                violation.to_string(),
            )));
        }

        if config.environments.is_empty() {
            return Ok(ConfigLoad::Rejected(RuleEngineResult::error(
                run_id,
                FailureKind::Configuration,
                "Configuration declares no environments",
            )));
        }
        if config.rules.is_empty() {
            return Ok(ConfigLoad::Rejected(RuleEngineResult::error(
                run_id,
                FailureKind::Configuration,
                "Configuration declares no rules",
            )));
        }

        debug!(
            environments = config.environments.len(),
            rules = config.rules.len(),
            "configuration loaded"
        );
        Ok(ConfigLoad::Ready(config))
    }

    /// One spawned task per environment, joined in declaration order.
    async fn run_concurrent(
        &self,
        config: &Config,
        base: &Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnvironmentOutcome>> {
        let mut handles: Vec<(Environment, JoinHandle<EnvironmentOutcome>)> =
            Vec::with_capacity(config.environments.len());
        let mut cancelled = false;

        for environment in &config.environments {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let pipeline = self.pipeline.clone();
            let rules = config.rules_for(&environment.id);
            let env = environment.clone();
            let base = Arc::clone(base);
            let span = info_span!("environment", environment = %environment.id);
            let handle =
                tokio::spawn(async move { pipeline.run(env, rules, base).await }.instrument(span));
            handles.push((environment.clone(), handle));
        }

        let (environments, handles): (Vec<Environment>, Vec<_>) = handles.into_iter().unzip();
        let joined = join_all(handles).await;

        if cancelled {
            info!(started = joined.len(), "batch validation cancelled");
            return Err(EngineError::Cancelled);
        }

        Ok(environments
            .into_iter()
            .zip(joined)
            .map(|(environment, joined)| {
                joined.unwrap_or_else(|e| {
                    let detail = if e.is_panic() {
                        "validation pipeline panicked".to_string()
                    } else {
                        format!("validation pipeline aborted: {e}")
                    };
                    EnvironmentOutcome::critical(
                        &environment,
                        CriticalError::new(CriticalKind::Panic, detail),
                    )
                })
            })
            .collect())
    }

    /// Environments validated inline, in declaration order.
    async fn run_sequential(
        &self,
        config: &Config,
        base: &Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnvironmentOutcome>> {
        let mut outcomes = Vec::with_capacity(config.environments.len());

        for environment in &config.environments {
            if cancel.is_cancelled() {
                info!(started = outcomes.len(), "batch validation cancelled");
                return Err(EngineError::Cancelled);
            }
            let rules = config.rules_for(&environment.id);
            let span = info_span!("environment", environment = %environment.id);
            let run = self
                .pipeline
                .run(environment.clone(), rules, Arc::clone(base))
                .instrument(span);

            let outcome = AssertUnwindSafe(run).catch_unwind().await.unwrap_or_else(|_| {
                EnvironmentOutcome::critical(
                    environment,
                    CriticalError::new(CriticalKind::Panic, "validation pipeline panicked"),
                )
            });
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

// ============================================================================
// Per-environment pipeline
// ============================================================================

enum ConfigLoad {
    Ready(Config),
    Rejected(RuleEngineResult),
}

enum EnvironmentOutcome {
    Validated(FileValidationResult),
    Failed {
        file: FileValidationResult,
        kind: FailureKind,
    },
    Critical {
        file: FileValidationResult,
        error: CriticalError,
    },
}

impl EnvironmentOutcome {
    fn failed(path: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            file: FileValidationResult::failed(path, message),
            kind,
        }
    }

    fn critical(environment: &Environment, error: CriticalError) -> Self {
        Self::Critical {
            file: FileValidationResult::failed(environment.path.clone(), error.to_string()),
            error,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Validated(file) if file.is_valid => "valid",
            Self::Validated(_) => "invalid",
            Self::Failed { .. } => "error",
            Self::Critical { .. } => "critical",
        }
    }
}

/// Everything one environment needs, cloneable into a spawned task.
#[derive(Clone)]
struct Pipeline {
    resolver: Arc<PathResolver>,
    settings_loader: Arc<dyn SettingsLoader>,
    catalog: Arc<ValidatorCatalog>,
    limits: Arc<SecurityLimits>,
}

impl Pipeline {
    async fn run(
        &self,
        environment: Environment,
        rules: Vec<Rule>,
        base: Arc<str>,
    ) -> EnvironmentOutcome {
        let started = Instant::now();
        let outcome = self.validate(&environment, &rules, &base).await;

        match &outcome {
            EnvironmentOutcome::Validated(file) => info!(
                path = %file.path,
                valid = file.is_valid,
                errors = file.error_count,
                "environment validated"
            ),
            EnvironmentOutcome::Failed { file, kind } => warn!(
                path = %file.path,
                kind = ?kind,
                error = file.error.as_deref().unwrap_or_default(),
                "environment could not be validated"
            ),
            EnvironmentOutcome::Critical { error: e, .. } => {
                error!(error = %e, "critical failure while validating environment");
                metrics::record_critical_error();
            }
        }
        metrics::record_environment(outcome.label(), started.elapsed());
        outcome
    }

    async fn validate(
        &self,
        environment: &Environment,
        rules: &[Rule],
        base: &str,
    ) -> EnvironmentOutcome {
        if environment.path.trim().is_empty() {
            return EnvironmentOutcome::failed(
                String::new(),
                FailureKind::Configuration,
                format!("Environment '{}' has no settings path", environment.id),
            );
        }

        // Canonicalization hits the filesystem; keep it off the async workers.
        let resolver = Arc::clone(&self.resolver);
        let (reference, base_owned) = (environment.path.clone(), base.to_string());
        let resolution =
            tokio::task::spawn_blocking(move || resolver.resolve_path(&reference, &base_owned))
                .await;

        let resolved: PathBuf = match resolution {
            Ok(Ok(path)) => path,
            Err(e) => {
                return EnvironmentOutcome::critical(
                    environment,
                    CriticalError::new(
                        CriticalKind::Panic,
                        format!("path resolution aborted: {e}"),
                    ),
                );
            }
            Ok(Err(e)) => {
                let kind = if e.is_security_violation() {
                    FailureKind::Security
                } else {
                    FailureKind::Configuration
                };
                return EnvironmentOutcome::failed(environment.path.clone(), kind, e.to_string());
            }
        };
        let label = resolved.display().to_string();

        let settings = match self.settings_loader.load_settings(&resolved).await {
            Ok(settings) => settings,
            Err(SettingsError::Critical(error)) => {
                return EnvironmentOutcome::Critical {
                    file: FileValidationResult::failed(label, error.to_string()),
                    error,
                };
            }
            Err(SettingsError::NotFound { .. }) => {
                return EnvironmentOutcome::failed(
                    label.clone(),
                    FailureKind::Settings,
                    format!("Settings file not found: {label}"),
                );
            }
            Err(e) => {
                return EnvironmentOutcome::failed(label, FailureKind::Settings, e.to_string());
            }
        };

        if let Err(violation) = self.limits.check_settings_depth(&settings) {
            metrics::record_security_denial("limit_exceeded");
            return EnvironmentOutcome::failed(label, FailureKind::Security, violation.to_string());
        }

        match validate_file(&label, rules, &settings, &self.catalog) {
            Ok(file) => EnvironmentOutcome::Validated(file),
            Err(e) => EnvironmentOutcome::failed(label, FailureKind::Configuration, e.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Condition, RuleDetail, ValidatorCondition};
    use crate::config::{InMemorySettingsLoader, StaticConfigProvider};
    use serde_json::json;

    fn sandbox() -> (tempfile::TempDir, PathBuf, String) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config_path = root.join("rules.json").display().to_string();
        (dir, root, config_path)
    }

    fn config(environments: &[(&str, &str)]) -> Config {
        Config {
            version: "1".to_string(),
            environments: environments
                .iter()
                .map(|(id, path)| Environment {
                    id: (*id).to_string(),
                    name: id.to_uppercase(),
                    path: (*path).to_string(),
                    description: None,
                })
                .collect(),
            rules: vec![Rule {
                id: "db".to_string(),
                environments: environments.iter().map(|(id, _)| (*id).to_string()).collect(),
                rule_detail: RuleDetail {
                    id: "db-detail".to_string(),
                    conditions: vec![Condition {
                        key: "Db:Host".to_string(),
                        validators: vec![ValidatorCondition::new(
                            "required",
                            None,
                            "host required",
                        )],
                    }],
                },
            }],
        }
    }

    fn engine(config: Config, loader: InMemorySettingsLoader) -> RuleEngine {
        RuleEngine::new(
            Arc::new(StaticConfigProvider::new(config)),
            Arc::new(loader),
            Arc::new(ValidatorCatalog::builtin()),
            EngineOptions::default(),
        )
    }

    fn host(value: &str) -> crate::config::FlattenedSettings {
        [("Db:Host".to_string(), json!(value))].into_iter().collect()
    }

    #[tokio::test]
    async fn single_environment_validates() {
        let (_dir, root, config_path) = sandbox();
        let loader = InMemorySettingsLoader::new().with_file(root.join("dev.json"), host("db"));
        let engine = engine(config(&[("dev", "dev.json")]), loader);

        let result = engine
            .validate_environment(&config_path, "dev", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_success);
        assert!(result.single_result().unwrap().is_valid);
        assert!(!result.run_id.is_empty());
    }

    #[tokio::test]
    async fn unknown_environment_is_error_result() {
        let (_dir, _root, config_path) = sandbox();
        let engine = engine(config(&[("dev", "dev.json")]), InMemorySettingsLoader::new());

        let result = engine
            .validate_environment(&config_path, "qa", &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.is_success);
        assert_eq!(result.failure, Some(FailureKind::Configuration));
        assert!(result.error_message.unwrap().contains("qa"));
    }

    #[tokio::test]
    async fn missing_settings_in_single_mode_is_error_result() {
        let (_dir, _root, config_path) = sandbox();
        let engine = engine(config(&[("prod", "prod.json")]), InMemorySettingsLoader::new());

        let result = engine
            .validate_environment(&config_path, "prod", &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.is_success);
        assert_eq!(result.failure, Some(FailureKind::Settings));
        assert!(!result.single_result().unwrap().is_valid);
    }

    #[tokio::test]
    async fn path_escape_is_security_failure() {
        let (_dir, _root, config_path) = sandbox();
        let engine = engine(config(&[("dev", "../../etc/passwd")]), InMemorySettingsLoader::new());

        let result = engine
            .validate_environment(&config_path, "dev", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.failure, Some(FailureKind::Security));
    }

    #[tokio::test]
    async fn empty_arguments_are_rejected() {
        let engine = engine(config(&[("dev", "dev.json")]), InMemorySettingsLoader::new());
        let cancel = CancellationToken::new();
        assert!(matches!(
            engine.validate_environment("", "dev", &cancel).await,
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.validate_environment("/x/rules.json", " ", &cancel).await,
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.validate_all_environments("", &cancel).await,
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn zero_rules_is_error_result() {
        let (_dir, _root, config_path) = sandbox();
        let mut cfg = config(&[("dev", "dev.json")]);
        cfg.rules.clear();
        let engine = engine(cfg, InMemorySettingsLoader::new());

        let result = engine
            .validate_all_environments(&config_path, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.is_success);
        assert!(result.batch_results().is_empty());
    }

    #[tokio::test]
    async fn environment_without_rules_fails_its_slot() {
        let (_dir, root, config_path) = sandbox();
        let mut cfg = config(&[("dev", "dev.json"), ("qa", "qa.json")]);
        cfg.rules[0].environments = vec!["dev".to_string()];
        let loader = InMemorySettingsLoader::new()
            .with_file(root.join("dev.json"), host("db"))
            .with_file(root.join("qa.json"), host("db"));
        let engine = engine(cfg, loader);

        let result = engine
            .validate_all_environments(&config_path, &CancellationToken::new())
            .await
            .unwrap();
        let files = result.batch_results();
        assert_eq!(files.len(), 2);
        assert!(files[0].is_valid);
        assert!(!files[1].is_valid);
        assert!(files[1].error.as_deref().unwrap().contains("no rules"));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let (_dir, _root, config_path) = sandbox();
        let engine = engine(config(&[("dev", "dev.json")]), InMemorySettingsLoader::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            engine.validate_all_environments(&config_path, &cancel).await,
            Err(EngineError::Cancelled)
        ));
        assert!(matches!(
            engine.validate_environment(&config_path, "dev", &cancel).await,
            Err(EngineError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn sequential_mode_matches_concurrent() {
        let (_dir, root, config_path) = sandbox();
        let cfg = config(&[("b", "b.json"), ("a", "a.json"), ("c", "c.json")]);
        let loader = InMemorySettingsLoader::new()
            .with_file(root.join("a.json"), host("db"))
            .with_file(root.join("b.json"), host(""))
            .with_file(root.join("c.json"), host("db"));

        let concurrent = engine(cfg.clone(), loader.clone());
        let sequential = RuleEngine::new(
            Arc::new(StaticConfigProvider::new(cfg)),
            Arc::new(loader),
            Arc::new(ValidatorCatalog::builtin()),
            EngineOptions {
                execution: ExecutionMode::Sequential,
                ..EngineOptions::default()
            },
        );

        let cancel = CancellationToken::new();
        let a = concurrent.validate_all_environments(&config_path, &cancel).await.unwrap();
        let b = sequential.validate_all_environments(&config_path, &cancel).await.unwrap();
        assert_eq!(a.batch_results(), b.batch_results());
        assert!(a.batch_results()[0].path.ends_with("a.json"));
    }

    #[tokio::test]
    async fn settings_depth_limit_fails_slot() {
        let (_dir, root, config_path) = sandbox();
        let deep_key = (0..40).map(|i| format!("k{i}")).collect::<Vec<_>>().join(":");
        let settings = [(deep_key, json!("x")), ("Db:Host".to_string(), json!("db"))]
            .into_iter()
            .collect();
        let loader = InMemorySettingsLoader::new().with_file(root.join("dev.json"), settings);
        let engine = engine(config(&[("dev", "dev.json")]), loader);

        let result = engine
            .validate_environment(&config_path, "dev", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.failure, Some(FailureKind::Security));
    }
}
