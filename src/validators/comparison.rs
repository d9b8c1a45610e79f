//! Range validators: `gt`, `gte`, `lt`, `lte`.
//!
//! Both sides are coerced to numbers when possible; otherwise the string
//! projections are compared ordinally. An absent value passes, since absence
//! is the concern of `required`.

use std::cmp::Ordering;

use serde_json::Value;

use super::{ValidationResult, Validator, as_number, present, string_projection};
use crate::config::schema::ValidatorCondition;

/// Comparison operator applied as `value <op> declared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl RangeOp {
    /// Validator id for this operator.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Gte => matches!(ordering, Ordering::Greater | Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Lte => matches!(ordering, Ordering::Less | Ordering::Equal),
        }
    }
}

/// Compares the value against a declared bound.
#[derive(Debug, Clone, Copy)]
pub struct RangeValidator {
    op: RangeOp,
}

impl RangeValidator {
    /// Creates a range validator for the given operator.
    #[must_use]
    pub const fn new(op: RangeOp) -> Self {
        Self { op }
    }
}

fn is_comparable(value: &Value) -> bool {
    !(value.is_array() || value.is_object())
}

fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (as_number(actual), as_number(bound)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => {
            let a = string_projection(Some(actual))?;
            let b = string_projection(Some(bound))?;
            Some(a.cmp(&b))
        }
    }
}

impl Validator for RangeValidator {
    fn id(&self) -> &str {
        self.op.id()
    }

    fn validate(
        &self,
        key: &str,
        value: Option<&Value>,
        condition: &ValidatorCondition,
    ) -> ValidationResult {
        let Some(bound) = present(condition.value.as_ref()) else {
            return ValidationResult::misconfigured(
                self.id(),
                key,
                value,
                "a comparison bound is required",
            );
        };
        if !is_comparable(bound) {
            return ValidationResult::misconfigured(
                self.id(),
                key,
                value,
                &format!("comparison bound must be a scalar, got {bound}"),
            );
        }

        let Some(actual) = present(value) else {
            return ValidationResult::pass(self.id(), key, value);
        };

        let passed = is_comparable(actual)
            && compare(actual, bound).is_some_and(|ordering| self.op.accepts(ordering));
        ValidationResult::from_check(passed, self.id(), key, value, &condition.message)
    }
}
