//! Applies a rule set to one flattened settings map.

use tracing::debug;

use super::result::FileValidationResult;
use crate::config::FlattenedSettings;
use crate::config::schema::Rule;
use crate::error::FileValidationError;
use crate::observability::metrics::{self, CheckOutcome};
use crate::validators::{VALIDATOR_CONFIG_ERROR_PREFIX, ValidationResult, ValidatorCatalog};

/// Validates `settings` against every condition of `rules`.
///
/// `rules` must already be filtered to the environment being validated.
/// A key missing from `settings` is passed to validators as absent. An
/// unknown validator type yields a failing configuration-error outcome for
/// that validator only.
///
/// # Errors
///
/// Returns [`FileValidationError::NoRules`] when `rules` is empty; an
/// environment without rules is a misconfiguration, not a vacuous pass.
pub fn validate_file(
    label: &str,
    rules: &[Rule],
    settings: &FlattenedSettings,
    catalog: &ValidatorCatalog,
) -> Result<FileValidationResult, FileValidationError> {
    if rules.is_empty() {
        return Err(FileValidationError::NoRules {
            label: label.to_string(),
        });
    }

    let mut results = Vec::new();

    for rule in rules {
        for condition in &rule.rule_detail.conditions {
            let value = settings.get(&condition.key);

            for declared in &condition.validators {
                let outcome = match catalog.get_validator(&declared.validator_type) {
                    Ok(validator) => validator.validate(&condition.key, value, declared),
                    Err(e) => ValidationResult::configuration_error(
                        &declared.validator_type,
                        &condition.key,
                        value,
                        &e.to_string(),
                    ),
                };

                if !outcome.is_valid {
                    debug!(
                        file = label,
                        rule = %rule.id,
                        key = %condition.key,
                        validator = %declared.validator_type,
                        message = %outcome.message,
                        "validation failed"
                    );
                }
                metrics::record_validation(&declared.validator_type, classify(&outcome));
                results.push(outcome);
            }
        }
    }

    Ok(FileValidationResult::from_results(label, results))
}

fn classify(outcome: &ValidationResult) -> CheckOutcome {
    if outcome.is_valid {
        CheckOutcome::Pass
    } else if outcome.error.is_some() || outcome.message.starts_with(VALIDATOR_CONFIG_ERROR_PREFIX)
    {
        CheckOutcome::Misconfigured
    } else {
        CheckOutcome::Fail
    }
}
