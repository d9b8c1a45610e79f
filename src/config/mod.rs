//! Configuration module
//!
//! The rule document model, the security limits and engine options injected
//! into the engine, and the collaborator seams through which already-parsed
//! configuration and settings reach the engine.

pub mod limits;
pub mod provider;
pub mod schema;

pub use limits::{EngineOptions, ExecutionMode, SecurityLimits};
pub use provider::{
    ConfigProvider, FlattenedSettings, InMemorySettingsLoader, SettingsLoader,
    StaticConfigProvider,
};
pub use schema::*;
