//! `required` validator.

use serde_json::Value;

use super::{ValidationResult, Validator, string_projection};
use crate::config::schema::ValidatorCondition;

/// Fails when the value is absent, null, empty, or whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredValidator;

impl Validator for RequiredValidator {
    fn id(&self) -> &str {
        "required"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let passed = string_projection(value).is_some_and(|s| !s.trim().is_empty());
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}
