//! Validators.
//!
//! A validator is a named, pure check of one settings value against the
//! parameter declared in a rule. Validators never return errors: a
//! misconfigured rule (for example a non-array value given to `in`) becomes
//! an ordinary failing [`ValidationResult`] whose message carries
//! [`VALIDATOR_CONFIG_ERROR_PREFIX`].
//!
//! # Built-in validators
//!
//! | Id | Passes when |
//! |----|-------------|
//! | `required` | value is present and not blank |
//! | `min_len` / `max_len` | character length is within the declared bound |
//! | `eq` / `ne` | value equals / differs from the declared value |
//! | `gt` / `gte` / `lt` / `lte` | value compares against the declared bound |
//! | `in` | value matches one of the declared array entries, ignoring case |

mod catalog;
mod comparison;
mod equality;
mod length;
mod membership;
mod required;

pub use catalog::ValidatorCatalog;
pub use comparison::{RangeOp, RangeValidator};
pub use equality::{EqualsValidator, NotEqualsValidator};
pub use length::{MaxLengthValidator, MinLengthValidator};
pub use membership::InValidator;
pub use required::RequiredValidator;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::schema::ValidatorCondition;

/// Message prefix for rules whose declared parameter the validator cannot use.
pub const VALIDATOR_CONFIG_ERROR_PREFIX: &str = "Validator configuration error: ";

/// Message prefix for rules that reference an unknown validator type.
pub const CONFIG_ERROR_PREFIX: &str = "Configuration error: ";

/// Ids of the validators constructed by [`builtin_validators`], in catalog order.
pub const BUILTIN_IDS: [&str; 10] = [
    "required", "min_len", "max_len", "eq", "ne", "gt", "gte", "lt", "lte", "in",
];

// ============================================================================
// Core Trait
// ============================================================================

/// A named check applied to one flattened settings value.
///
/// Implementations must be stateless with respect to individual calls; a
/// single instance is shared by every concurrently validated environment.
pub trait Validator: Send + Sync + std::fmt::Debug {
    /// The id rules use to reference this validator.
    fn id(&self) -> &str;

    /// Checks `value` (absent when the key is missing or null) against the
    /// declared `condition`.
    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult;
}

/// Constructs every built-in validator.
#[must_use]
pub fn builtin_validators() -> Vec<Arc<dyn Validator>> {
    vec![
        Arc::new(RequiredValidator),
        Arc::new(MinLengthValidator),
        Arc::new(MaxLengthValidator),
        Arc::new(EqualsValidator),
        Arc::new(NotEqualsValidator),
        Arc::new(RangeValidator::new(RangeOp::Gt)),
        Arc::new(RangeValidator::new(RangeOp::Gte)),
        Arc::new(RangeValidator::new(RangeOp::Lt)),
        Arc::new(RangeValidator::new(RangeOp::Lte)),
        Arc::new(InValidator),
    ]
}

// ============================================================================
// Result
// ============================================================================

/// Outcome of one validator invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Whether the check passed.
    pub is_valid: bool,

    /// The rule's message on failure; empty on success.
    pub message: String,

    /// Validator id as referenced by the rule.
    pub validator_type: String,

    /// Settings key that was checked.
    pub key: String,

    /// The value that was checked, if present.
    pub value: Option<Value>,

    /// Detail of a configuration problem, when the failure is not a mismatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    /// A passing outcome.
    #[must_use]
    pub fn pass(validator_type: &str, key: &str, value: Option<&Value>) -> Self {
        Self {
            is_valid: true,
            message: String::new(),
            validator_type: validator_type.to_string(),
            key: key.to_string(),
            value: value.cloned(),
            error: None,
        }
    }

    /// A failing outcome carrying the rule's message.
    #[must_use]
    pub fn fail(validator_type: &str, key: &str, value: Option<&Value>, message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
            validator_type: validator_type.to_string(),
            key: key.to_string(),
            value: value.cloned(),
            error: None,
        }
    }

    /// A failing outcome caused by an unusable declared parameter.
    #[must_use]
    pub fn misconfigured(
        validator_type: &str,
        key: &str,
        value: Option<&Value>,
        detail: &str,
    ) -> Self {
        Self {
            is_valid: false,
            message: format!("{VALIDATOR_CONFIG_ERROR_PREFIX}{detail}"),
            validator_type: validator_type.to_string(),
            key: key.to_string(),
            value: value.cloned(),
            error: Some(detail.to_string()),
        }
    }

    /// A failing outcome caused by a rule the engine cannot evaluate at all,
    /// such as an unknown validator type.
    #[must_use]
    pub fn configuration_error(
        validator_type: &str,
        key: &str,
        value: Option<&Value>,
        detail: &str,
    ) -> Self {
        Self {
            is_valid: false,
            message: format!("{CONFIG_ERROR_PREFIX}{detail}"),
            validator_type: validator_type.to_string(),
            key: key.to_string(),
            value: value.cloned(),
            error: Some(detail.to_string()),
        }
    }

    /// Builds a pass or a fail depending on `passed`.
    #[must_use]
    pub fn from_check(
        passed: bool,
        validator_type: &str,
        key: &str,
        value: Option<&Value>,
        message: &str,
    ) -> Self {
        if passed {
            Self::pass(validator_type, key, value)
        } else {
            Self::fail(validator_type, key, value, message)
        }
    }
}

// ============================================================================
// Value helpers
// ============================================================================

/// Treats JSON `null` the same as an absent key.
#[must_use]
pub fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// String form of a settings value.
///
/// Strings are returned as-is, scalars through their JSON text, and
/// composites as compact JSON. Absent and `null` have no projection.
#[must_use]
pub fn string_projection(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Numeric coercion: JSON numbers and strings holding a finite number.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Parses a length threshold from a declared value.
///
/// Accepts a non-negative integer, a string holding one, or either of those
/// wrapped in a single-element array (`[5]`, `["5"]`).
pub(crate) fn parse_threshold(declared: Option<&Value>) -> Result<usize, String> {
    let Some(declared) = present(declared) else {
        return Err("a numeric threshold is required".to_string());
    };

    match declared {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| format!("threshold must be a non-negative integer, got {n}")),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("threshold must be a non-negative integer, got '{s}'")),
        Value::Array(items) if items.len() == 1 => parse_threshold(items.first()),
        other => Err(format!(
            "threshold must be a non-negative integer, got {other}"
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
