//! `settings-guard` - rule-based validation of deployment settings
//!
//! Runs declarative rule sets against the settings files of one or many
//! target environments before deployment. The crate provides the
//! validation engine only: file parsing, output formatting and process
//! exit codes belong to the host.
//!
//! ```text
//! RuleEngine ─► PathResolver ─► SettingsLoader ─► validate_file ─► ValidatorCatalog
//!     ▲                                                                  │
//!     └──────────────────────── RuleEngineResult ◄───────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod path;
pub mod plugins;
pub mod validators;

pub use config::{
    Config, ConfigProvider, EngineOptions, ExecutionMode, FlattenedSettings, SecurityLimits,
    SettingsLoader,
};
pub use engine::{FileValidationResult, RuleEngine, RuleEngineResult};
pub use error::{CriticalError, CriticalKind, EngineError};
pub use path::PathResolver;
pub use validators::{ValidationResult, Validator, ValidatorCatalog};
