//! `min_len` and `max_len` validators.
//!
//! Length is measured in characters of the value's string projection.

use serde_json::Value;

use super::{ValidationResult, Validator, parse_threshold, string_projection};
use crate::config::schema::ValidatorCondition;

fn char_len(value: Option<&Value>) -> usize {
    string_projection(value).map_or(0, |s| s.chars().count())
}

/// Fails when the value is shorter than the declared threshold.
///
/// An absent value has length zero, so it only passes a zero threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinLengthValidator;

impl Validator for MinLengthValidator {
    fn id(&self) -> &str {
        "min_len"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let min = match parse_threshold(condition.value.as_ref()) {
            Ok(min) => min,
            Err(detail) => return ValidationResult::misconfigured(self.id(), key, value, &detail),
        };
        let passed = char_len(value) >= min;
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}

/// Fails when the value is longer than the declared threshold.
///
/// An absent or empty value always passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxLengthValidator;

impl Validator for MaxLengthValidator {
    fn id(&self) -> &str {
        "max_len"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let max = match parse_threshold(condition.value.as_ref()) {
            Ok(max) => max,
            Err(detail) => return ValidationResult::misconfigured(self.id(), key, value, &detail),
        };
        let len = char_len(value);
        let passed = len == 0 || len <= max;
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}
