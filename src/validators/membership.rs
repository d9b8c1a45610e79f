//! `in` validator.

use serde_json::Value;

use super::{ValidationResult, Validator, present, string_projection};
use crate::config::schema::ValidatorCondition;

/// Passes when the value matches one of the declared entries, ignoring case.
///
/// The declared value must be an array, either native or a string holding a
/// JSON array. Anything else is a rule configuration failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct InValidator;

fn allowed_entries(declared: Option<&Value>) -> Result<Vec<String>, String> {
    let items = match present(declared) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            _ => {
                return Err(format!(
                    "'in' requires an array of allowed values, got string '{text}'"
                ));
            }
        },
        Some(other) => {
            return Err(format!(
                "'in' requires an array of allowed values, got {other}"
            ));
        }
        None => return Err("'in' requires an array of allowed values".to_string()),
    };

    Ok(items
        .iter()
        .filter_map(|item| string_projection(Some(item)))
        .collect())
}

impl Validator for InValidator {
    fn id(&self) -> &str {
        "in"
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let allowed = match allowed_entries(condition.value.as_ref()) {
            Ok(allowed) => allowed,
            Err(detail) => return ValidationResult::misconfigured(self.id(), key, value, &detail),
        };

        let passed = string_projection(value).is_some_and(|actual| {
            let actual = actual.to_lowercase();
            allowed.iter().any(|entry| entry.to_lowercase() == actual)
        });
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}
