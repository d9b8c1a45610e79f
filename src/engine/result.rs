//! Engine result types.
//!
//! These are the only externally visible contract of the engine. They are
//! built once and never mutated after being returned; formatters and hooks
//! consume them through `serde`.

use serde::Serialize;

use crate::error::CriticalError;
use crate::validators::ValidationResult;

/// Outcome of validating one settings file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileValidationResult {
    /// Resolved settings path, or the declared reference when resolution
    /// failed.
    pub path: String,

    /// Every validator outcome, in rule and condition order.
    pub results: Vec<ValidationResult>,

    /// `true` when every outcome passed.
    pub is_valid: bool,

    /// Number of failing outcomes (at least 1 for a failed file).
    pub error_count: usize,

    /// Reason the file could not be validated at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileValidationResult {
    /// Aggregates validator outcomes.
    #[must_use]
    pub fn from_results(path: impl Into<String>, results: Vec<ValidationResult>) -> Self {
        let error_count = results.iter().filter(|r| !r.is_valid).count();
        Self {
            path: path.into(),
            is_valid: error_count == 0,
            error_count,
            results,
            error: None,
        }
    }

    /// A file that could not be validated (missing, unreadable, denied).
    #[must_use]
    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            results: Vec::new(),
            is_valid: false,
            error_count: 1,
            error: Some(error.into()),
        }
    }
}

/// Classification of an engine-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or unusable rule document, unknown environment, no rules.
    Configuration,
    /// Path escape, oversized input, or an exceeded limit.
    Security,
    /// The settings file was missing or could not be loaded.
    Settings,
    /// One or more environments failed critically (batch mode).
    Critical,
}

/// Validation results carried by a [`RuleEngineResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "files", rename_all = "snake_case")]
pub enum ValidationResults {
    /// No environment was validated.
    None,
    /// Single-environment mode.
    Single(FileValidationResult),
    /// Batch mode, sorted by path ignoring case.
    Batch(Vec<FileValidationResult>),
}

/// Top-level result of an engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEngineResult {
    /// `true` when the engine completed the run. Individual files may still
    /// be invalid.
    pub is_success: bool,

    /// Human-readable failure summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Per-file outcomes.
    pub validation_results: ValidationResults,

    /// Critical failures captured in batch mode.
    pub critical_errors: Vec<CriticalError>,

    /// Correlates the result with the run's log records.
    pub run_id: String,
}

impl RuleEngineResult {
    pub(crate) fn single(run_id: &str, result: FileValidationResult) -> Self {
        Self {
            is_success: true,
            error_message: None,
            failure: None,
            validation_results: ValidationResults::Single(result),
            critical_errors: Vec::new(),
            run_id: run_id.to_string(),
        }
    }

    pub(crate) fn batch(
        run_id: &str,
        results: Vec<FileValidationResult>,
        critical_errors: Vec<CriticalError>,
    ) -> Self {
        let (is_success, error_message, failure) = if critical_errors.is_empty() {
            (true, None, None)
        } else {
            (
                false,
                Some(format!(
                    "{} environment(s) failed with a critical error",
                    critical_errors.len()
                )),
                Some(FailureKind::Critical),
            )
        };

        Self {
            is_success,
            error_message,
            failure,
            validation_results: ValidationResults::Batch(results),
            critical_errors,
            run_id: run_id.to_string(),
        }
    }

    pub(crate) fn error(run_id: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            error_message: Some(message.into()),
            failure: Some(kind),
            validation_results: ValidationResults::None,
            critical_errors: Vec::new(),
            run_id: run_id.to_string(),
        }
    }

    #[must_use]
    pub(crate) fn with_results(mut self, results: ValidationResults) -> Self {
        self.validation_results = results;
        self
    }

    /// The single-environment result, if any.
    #[must_use]
    pub const fn single_result(&self) -> Option<&FileValidationResult> {
        match &self.validation_results {
            ValidationResults::Single(result) => Some(result),
            _ => None,
        }
    }

    /// The batch results, empty outside batch mode.
    #[must_use]
    pub fn batch_results(&self) -> &[FileValidationResult] {
        match &self.validation_results {
            ValidationResults::Batch(results) => results,
            _ => &[],
        }
    }

    /// `true` when the run succeeded and every validated file is valid.
    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.is_success
            && match &self.validation_results {
                ValidationResults::None => false,
                ValidationResults::Single(result) => result.is_valid,
                ValidationResults::Batch(results) => results.iter().all(|r| r.is_valid),
            }
    }
}
