//! Validation engine.
//!
//! [`RuleEngine`] orchestrates a run; [`validate_file`] applies rules to one
//! settings map; the result types are the engine's output contract.

mod file_validator;
mod result;
mod rule_engine;

pub use file_validator::validate_file;
pub use result::{FailureKind, FileValidationResult, RuleEngineResult, ValidationResults};
pub use rule_engine::RuleEngine;
