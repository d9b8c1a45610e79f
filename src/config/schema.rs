//! Rule document schema.
//!
//! Mirrors the rule file shape consumed from the external loader:
//!
//! ```text
//! {
//!   "version": "1",
//!   "environments": [{"id", "name", "path", "description?"}],
//!   "rules": [{"id", "environments": ["id", ...],
//!              "rule": {"id", "conditions": [{"key", "condition": [{"validator", "value?", "message"}]}]}}]
//! }
//! ```
//!
//! Types are immutable once loaded for an invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Document format version.
    pub version: String,

    /// Validation targets.
    #[serde(default)]
    pub environments: Vec<Environment>,

    /// Rules binding conditions to environments.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Config {
    /// Looks up an environment by id.
    ///
    /// Ids are unique within a document; uniqueness is enforced by the
    /// structural validator upstream, so the first match is returned.
    #[must_use]
    pub fn environment(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|env| env.id == id)
    }

    /// Returns the rules that apply to the given environment id.
    #[must_use]
    pub fn rules_for(&self, environment_id: &str) -> Vec<Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(environment_id))
            .cloned()
            .collect()
    }
}

/// A named validation target pointing at one settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique id referenced by rules.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Settings file path, relative to the rule document or absolute.
    pub path: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Binds a set of environments to one rule detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule id.
    pub id: String,

    /// Environment ids this rule applies to.
    #[serde(default)]
    pub environments: Vec<String>,

    /// The conditions to check.
    #[serde(rename = "rule")]
    pub rule_detail: RuleDetail,
}

impl Rule {
    /// Returns `true` if this rule references the environment.
    #[must_use]
    pub fn applies_to(&self, environment_id: &str) -> bool {
        self.environments.iter().any(|id| id == environment_id)
    }
}

/// The body of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDetail {
    /// Rule detail id.
    pub id: String,

    /// Conditions evaluated against the settings map.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A settings key plus the validators applied to its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Colon-joined flattened settings key (e.g. `Database:ConnectionString`).
    pub key: String,

    /// Validators to apply.
    #[serde(rename = "condition", default)]
    pub validators: Vec<ValidatorCondition>,
}

/// One validator invocation declared in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorCondition {
    /// Validator id, matched case-insensitively against the catalog.
    #[serde(rename = "validator")]
    pub validator_type: String,

    /// Declared parameter, e.g. a threshold or the allowed set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Message reported when the check fails.
    #[serde(default)]
    pub message: String,
}

impl ValidatorCondition {
    /// Creates a validator condition.
    #[must_use]
    pub fn new(validator_type: &str, value: Option<Value>, message: &str) -> Self {
        Self {
            validator_type: validator_type.to_string(),
            value,
            message: message.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Config {
        serde_json::from_value(json!({
            "version": "1",
            "environments": [
                {"id": "dev", "name": "Development", "path": "dev.json"},
                {"id": "prod", "name": "Production", "path": "prod.json", "description": "live"}
            ],
            "rules": [
                {
                    "id": "r1",
                    "environments": ["dev", "prod"],
                    "rule": {
                        "id": "db",
                        "conditions": [
                            {"key": "Db:Host", "condition": [
                                {"validator": "required", "message": "host required"}
                            ]}
                        ]
                    }
                },
                {
                    "id": "r2",
                    "environments": ["prod"],
                    "rule": {
                        "id": "tls",
                        "conditions": [
                            {"key": "Tls:Enabled", "condition": [
                                {"validator": "eq", "value": "true", "message": "tls must be on"}
                            ]}
                        ]
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn deserializes_document_shape() {
        let config = sample();
        assert_eq!(config.version, "1");
        assert_eq!(config.environments.len(), 2);
        assert_eq!(config.environments[1].description.as_deref(), Some("live"));
        let cond = &config.rules[1].rule_detail.conditions[0];
        assert_eq!(cond.key, "Tls:Enabled");
        assert_eq!(cond.validators[0].validator_type, "eq");
        assert_eq!(cond.validators[0].value, Some(json!("true")));
    }

    #[test]
    fn missing_value_is_none() {
        let config = sample();
        let vc = &config.rules[0].rule_detail.conditions[0].validators[0];
        assert!(vc.value.is_none());
    }

    #[test]
    fn environment_lookup() {
        let config = sample();
        assert_eq!(config.environment("prod").unwrap().path, "prod.json");
        assert!(config.environment("staging").is_none());
    }

    #[test]
    fn rules_for_filters_by_environment() {
        let config = sample();
        assert_eq!(config.rules_for("dev").len(), 1);
        assert_eq!(config.rules_for("prod").len(), 2);
        assert!(config.rules_for("qa").is_empty());
    }

    #[test]
    fn serializes_with_document_field_names() {
        let config = sample();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value["rules"][0]["rule"]["conditions"][0]["condition"][0]["validator"].is_string());
        assert!(value["environments"][0].get("description").is_none());
    }
}
