//! Security limits and engine options.
//!
//! Limits are injected into the engine rather than chosen per call. Each
//! default can be overridden through a `SETTINGS_GUARD_*` environment
//! variable so deployments can tighten them without a rebuild.

use std::path::PathBuf;

use crate::config::schema::Config;
use crate::config::provider::FlattenedSettings;
use crate::error::LimitViolation;

/// Resource limits enforced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityLimits {
    /// Maximum number of environments in one rule document.
    pub max_environments: usize,

    /// Maximum number of rules in one rule document.
    pub max_rules: usize,

    /// Maximum number of conditions in one rule.
    pub max_conditions_per_rule: usize,

    /// Maximum number of validators attached to one condition.
    pub max_validators_per_condition: usize,

    /// Maximum number of entries held by the path resolver cache.
    pub max_path_cache_size: usize,

    /// Maximum length in bytes of a path reference.
    pub max_path_length: usize,

    /// Maximum number of colon-joined segments in a flattened settings key.
    pub max_settings_depth: usize,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_environments: env_or("SETTINGS_GUARD_MAX_ENVIRONMENTS", 100),
            max_rules: env_or("SETTINGS_GUARD_MAX_RULES", 1000),
            max_conditions_per_rule: env_or("SETTINGS_GUARD_MAX_CONDITIONS_PER_RULE", 100),
            max_validators_per_condition: env_or(
                "SETTINGS_GUARD_MAX_VALIDATORS_PER_CONDITION",
                20,
            ),
            max_path_cache_size: env_or("SETTINGS_GUARD_MAX_PATH_CACHE_SIZE", 1000),
            max_path_length: env_or("SETTINGS_GUARD_MAX_PATH_LENGTH", 4096),
            max_settings_depth: env_or("SETTINGS_GUARD_MAX_SETTINGS_DEPTH", 32),
        }
    }
}

impl SecurityLimits {
    /// Checks the structural size of a rule document.
    ///
    /// # Errors
    ///
    /// Returns the first [`LimitViolation`] found.
    pub fn check_config(&self, config: &Config) -> Result<(), LimitViolation> {
        check("environment", config.environments.len(), self.max_environments)?;
        check("rule", config.rules.len(), self.max_rules)?;

        for rule in &config.rules {
            let conditions = &rule.rule_detail.conditions;
            check(
                &format!("condition (rule '{}')", rule.id),
                conditions.len(),
                self.max_conditions_per_rule,
            )?;
            for condition in conditions {
                check(
                    &format!("validator (key '{}')", condition.key),
                    condition.validators.len(),
                    self.max_validators_per_condition,
                )?;
            }
        }

        Ok(())
    }

    /// Checks the nesting depth of every flattened settings key.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitViolation`] naming the deepest offending key.
    pub fn check_settings_depth(&self, settings: &FlattenedSettings) -> Result<(), LimitViolation> {
        let deepest = settings
            .keys()
            .map(|key| (key, key.split(':').count()))
            .max_by_key(|(_, depth)| *depth);

        match deepest {
            Some((key, depth)) if depth > self.max_settings_depth => Err(LimitViolation {
                what: format!("nesting depth (key '{key}')"),
                actual: depth,
                limit: self.max_settings_depth,
            }),
            _ => Ok(()),
        }
    }
}

/// How batch validation schedules per-environment pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One spawned task per environment, joined before aggregation.
    #[default]
    Concurrent,
    /// Environments validated inline, in declaration order.
    Sequential,
}

/// Options for constructing a [`RuleEngine`](crate::engine::RuleEngine).
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Batch scheduling.
    pub execution: ExecutionMode,

    /// Security limits.
    pub limits: SecurityLimits,

    /// Directories scanned for validator plugins.
    pub plugin_directories: Vec<PathBuf>,
}

fn check(what: &str, actual: usize, limit: usize) -> Result<(), LimitViolation> {
    if actual > limit {
        return Err(LimitViolation {
            what: what.to_string(),
            actual,
            limit,
        });
    }
    Ok(())
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
