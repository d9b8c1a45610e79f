//! Bundled plugin modules.
//!
//! These validators are not part of the built-in set. They only become
//! available when a matching module file (for example `text_patterns.so`)
//! is present in a configured plugin directory.

use regex::Regex;
use serde_json::Value;

use super::loader::{StaticModuleLoader, ValidatorExport};
use crate::config::schema::ValidatorCondition;
use crate::error::PluginError;
use crate::validators::{ValidationResult, Validator, present, string_projection};

/// Module name of the text pattern validators.
pub const TEXT_PATTERNS_MODULE: &str = "text_patterns";

pub(super) fn register(loader: StaticModuleLoader) -> StaticModuleLoader {
    loader.register(
        TEXT_PATTERNS_MODULE,
        vec![
            ValidatorExport {
                type_name: "RegexValidator",
                construct: construct_regex,
            },
            ValidatorExport {
                type_name: "StartsWithValidator",
                construct: construct_starts_with,
            },
        ],
    )
}

fn construct_regex() -> Result<Box<dyn Validator>, PluginError> {
    Ok(Box::new(RegexValidator))
}

fn construct_starts_with() -> Result<Box<dyn Validator>, PluginError> {
    Ok(Box::new(StartsWithValidator))
}

fn declared_text<'a>(condition: &'a ValidatorCondition, what: &str) -> Result<&'a str, String> {
    match present(condition.value.as_ref()) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("{what} must be a string, got {other}")),
        None => Err(format!("a {what} is required")),
    }
}

/// Passes when the value matches the declared regular expression.
///
/// An absent value passes; pair with `required` to demand presence.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexValidator;

impl Validator for RegexValidator {
    fn id(&self) -> &str {
        "regex"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let pattern = match declared_text(condition, "pattern") {
            Ok(p) => p,
            Err(detail) => return ValidationResult::misconfigured(self.id(), key, value, &detail),
        };
        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => {
                return ValidationResult::misconfigured(
                    self.id(),
                    key,
                    value,
                    &format!("invalid pattern '{pattern}': {e}"),
                );
            }
        };

        let Some(actual) = string_projection(value) else {
            return ValidationResult::pass(self.id(), key, value);
        };
        ValidationResult::from_check(
            regex.is_match(&actual),
            self.id(),
            key,
            value,
            &condition.message,
        )
    }
}

/// Passes when the value starts with the declared prefix (case-sensitive).
///
/// An absent value passes; pair with `required` to demand presence.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartsWithValidator;

impl Validator for StartsWithValidator {
    fn id(&self) -> &str {
        "starts_with"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let prefix = match declared_text(condition, "prefix") {
            Ok(p) => p,
            Err(detail) => return ValidationResult::misconfigured(self.id(), key, value, &detail),
        };
        let Some(actual) = string_projection(value) else {
            return ValidationResult::pass(self.id(), key, value);
        };
        ValidationResult::from_check(
            actual.starts_with(prefix),
            self.id(),
            key,
            value,
            &condition.message,
        )
    }
}
