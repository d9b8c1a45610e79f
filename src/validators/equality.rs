//! `eq` and `ne` validators.
//!
//! Equality is structural: identical JSON values are equal, and scalars are
//! also equal when their string projections or numeric values match, so a
//! settings string `"5"` equals a declared `5`.
//!
//! A missing value is never equal to anything, including a missing declared
//! value: both absent fails `eq` and passes `ne`.

use serde_json::Value;

use super::{ValidationResult, Validator, as_number, present, string_projection};
use crate::config::schema::ValidatorCondition;

/// Structural equality with absence never matching.
#[allow(clippy::float_cmp)]
pub(crate) fn values_equal(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let (Some(actual), Some(expected)) = (present(actual), present(expected)) else {
        return false;
    };

    if actual == expected {
        return true;
    }

    let scalar = |v: &Value| !(v.is_array() || v.is_object());
    if !(scalar(actual) && scalar(expected)) {
        return false;
    }

    if string_projection(Some(actual)) == string_projection(Some(expected)) {
        return true;
    }

    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Passes when the value equals the declared value.
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualsValidator;

impl Validator for EqualsValidator {
    fn id(&self) -> &str {
        "eq"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let passed = values_equal(value, condition.value.as_ref());
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}

/// Passes when the value differs from the declared value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotEqualsValidator;

impl Validator for NotEqualsValidator {
    fn id(&self) -> &str {
        "ne"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let passed = !values_equal(value, condition.value.as_ref());
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}
