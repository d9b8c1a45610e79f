//! Error types for `settings-guard`
//!
//! Every recoverable condition is converted into a structured result at the
//! rule engine boundary. Only [`EngineError`] crosses that boundary, and only
//! for invalid arguments, cancellation, and critical failures raised in
//! single-environment mode.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Errors returned from the public [`RuleEngine`](crate::engine::RuleEngine) API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller passed an argument the engine cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A process-fatal failure raised while validating a single environment.
    #[error(transparent)]
    Critical(#[from] CriticalError),

    /// Cancellation was observed at a phase boundary.
    #[error("validation cancelled")]
    Cancelled,
}

// ============================================================================
// Critical Errors
// ============================================================================

/// Classes of failure that must never be treated as a validation mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalKind {
    /// Allocation failure reported by a collaborator.
    OutOfMemory,
    /// Unbounded recursion detected by a collaborator.
    StackOverflow,
    /// Memory access violation reported by a collaborator.
    AccessViolation,
    /// Corrupted or invalid program image.
    InvalidImage,
    /// A validation pipeline panicked.
    Panic,
}

impl std::fmt::Display for CriticalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::OutOfMemory => "out of memory",
            Self::StackOverflow => "stack overflow",
            Self::AccessViolation => "access violation",
            Self::InvalidImage => "invalid program image",
            Self::Panic => "panic",
        };
        f.write_str(label)
    }
}

/// A process-fatal failure.
///
/// Re-raised to the caller in single-environment mode; recorded on the
/// result without aborting sibling environments in batch mode.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("critical failure ({kind}): {message}")]
pub struct CriticalError {
    /// Failure class.
    pub kind: CriticalKind,
    /// Human-readable detail.
    pub message: String,
}

impl CriticalError {
    /// Creates a critical error of the given kind.
    #[must_use]
    pub fn new(kind: CriticalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// Path Errors
// ============================================================================

/// Path resolution failures.
#[derive(Debug, Error)]
pub enum PathError {
    /// Programming error: the base path was empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resolved path escapes its base directory.
    #[error("access denied: path '{path}' resolves outside of '{base}'")]
    AccessDenied {
        /// The offending path as supplied.
        path: String,
        /// The directory it had to stay within.
        base: PathBuf,
    },

    /// The supplied path exceeds the configured length limit.
    #[error("path length {length} exceeds limit of {limit}")]
    PathTooLong {
        /// Length of the supplied path in bytes.
        length: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Filesystem failure while canonicalizing.
    #[error("I/O error resolving {path}: {source}")]
    Io {
        /// Path being canonicalized.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl PathError {
    /// Returns `true` for security classifications (escape, oversized input).
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(self, Self::AccessDenied { .. } | Self::PathTooLong { .. })
    }
}

// ============================================================================
// Validator Errors
// ============================================================================

/// Validator catalog lookup failures.
#[derive(Debug, Clone, Error)]
pub enum ValidatorError {
    /// No validator is registered under the requested type.
    #[error(
        "unknown validator type '{requested}'{}; supported validators: {}",
        suggestion_hint(.suggestion.as_deref()),
        .supported.join(", ")
    )]
    UnknownType {
        /// The type name that was requested.
        requested: String,
        /// Every currently registered id, sorted.
        supported: Vec<String>,
        /// Closest registered id, if any is near enough.
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Plugin Errors
// ============================================================================

/// Plugin discovery failures. Discovery logs these and moves on.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// Plugin directory does not exist.
    #[error("plugin directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// A candidate module could not be loaded.
    #[error("failed to load plugin module {path}: {reason}")]
    ModuleLoadFailed {
        /// Module file.
        path: PathBuf,
        /// Loader-provided reason.
        reason: String,
    },

    /// An exported validator type could not be constructed.
    #[error("failed to instantiate validator type '{type_name}': {reason}")]
    InstantiationFailed {
        /// Exported type name.
        type_name: String,
        /// Constructor-provided reason.
        reason: String,
    },

    /// An instantiated validator declared an empty or blank id.
    #[error("validator type '{type_name}' declares an empty id")]
    EmptyId {
        /// Exported type name.
        type_name: String,
    },

    /// The declared id is already registered.
    #[error("validator id '{id}' is already registered")]
    DuplicateId {
        /// Conflicting id.
        id: String,
    },
}

impl PluginError {
    /// Closed-set label for metrics.
    #[must_use]
    pub const fn reason_label(&self) -> &'static str {
        match self {
            Self::DirectoryNotFound(_) => "directory_not_found",
            Self::ModuleLoadFailed { .. } => "load_failed",
            Self::InstantiationFailed { .. } => "instantiation_failed",
            Self::EmptyId { .. } => "empty_id",
            Self::DuplicateId { .. } => "duplicate_id",
        }
    }
}

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Failures reported by a [`ConfigProvider`](crate::config::ConfigProvider).
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The config document does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(String),

    /// The config document exists but could not be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures reported by a [`SettingsLoader`](crate::config::SettingsLoader).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file does not exist.
    #[error("settings file not found: {}", path.display())]
    NotFound {
        /// Settings file path.
        path: PathBuf,
    },

    /// The settings file exists but could not be loaded.
    #[error("failed to load settings from {}: {message}", path.display())]
    Invalid {
        /// Settings file path.
        path: PathBuf,
        /// Loader-provided detail.
        message: String,
    },

    /// Process-fatal failure while loading.
    #[error(transparent)]
    Critical(#[from] CriticalError),
}

impl SettingsError {
    /// Returns `true` if this failure must not be treated as recoverable.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Critical(_))
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Hard failures of the file validator.
#[derive(Debug, Error)]
pub enum FileValidationError {
    /// No rules apply to the file being validated.
    #[error("no rules apply to {label}")]
    NoRules {
        /// Label of the file being validated.
        label: String,
    },
}

/// A configured security limit was exceeded.
#[derive(Debug, Clone, Error)]
#[error("{what} count {actual} exceeds limit of {limit}")]
pub struct LimitViolation {
    /// What was counted.
    pub what: String,
    /// Observed count.
    pub actual: usize,
    /// Configured limit.
    pub limit: usize,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_is_security_violation() {
        let err = PathError::AccessDenied {
            path: "../secret.json".to_string(),
            base: PathBuf::from("/srv/app"),
        };
        assert!(err.is_security_violation());
        assert!(err.to_string().contains("../secret.json"));
    }

    #[test]
    fn invalid_argument_is_not_security_violation() {
        let err = PathError::InvalidArgument("base path is empty".to_string());
        assert!(!err.is_security_violation());
    }

    #[test]
    fn too_long_is_security_violation() {
        let err = PathError::PathTooLong {
            length: 5000,
            limit: 4096,
        };
        assert!(err.is_security_violation());
    }

    #[test]
    fn unknown_type_lists_supported_set() {
        let err = ValidatorError::UnknownType {
            requested: "requried".to_string(),
            supported: vec!["eq".to_string(), "required".to_string()],
            suggestion: Some("required".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("'requried'"));
        assert!(msg.contains("did you mean 'required'?"));
        assert!(msg.ends_with("supported validators: eq, required"));
    }

    #[test]
    fn unknown_type_without_suggestion() {
        let err = ValidatorError::UnknownType {
            requested: "zzz".to_string(),
            supported: vec!["eq".to_string()],
            suggestion: None,
        };
        assert!(!err.to_string().contains("did you mean"));
    }

    #[test]
    fn settings_critical_classification() {
        let err: SettingsError = CriticalError::new(CriticalKind::OutOfMemory, "boom").into();
        assert!(err.is_critical());
        let err = SettingsError::NotFound {
            path: PathBuf::from("prod.json"),
        };
        assert!(!err.is_critical());
    }

    #[test]
    fn critical_error_display() {
        let err = CriticalError::new(CriticalKind::StackOverflow, "recursion in loader");
        assert_eq!(
            err.to_string(),
            "critical failure (stack overflow): recursion in loader"
        );
    }

    #[test]
    fn plugin_reason_labels_are_distinct() {
        let labels = [
            PluginError::DirectoryNotFound(PathBuf::new()).reason_label(),
            PluginError::ModuleLoadFailed {
                path: PathBuf::new(),
                reason: String::new(),
            }
            .reason_label(),
            PluginError::InstantiationFailed {
                type_name: String::new(),
                reason: String::new(),
            }
            .reason_label(),
            PluginError::EmptyId {
                type_name: String::new(),
            }
            .reason_label(),
            PluginError::DuplicateId { id: String::new() }.reason_label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[test]
    fn limit_violation_display() {
        let err = LimitViolation {
            what: "environment".to_string(),
            actual: 101,
            limit: 100,
        };
        assert_eq!(err.to_string(), "environment count 101 exceeds limit of 100");
    }
}
