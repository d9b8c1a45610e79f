//! Plugin module loading.
//!
//! The crate forbids `unsafe`, so native libraries are never opened.
//! Instead a [`StaticModuleLoader`] maps module file names to validator
//! exports registered at compile time. A module file dropped into a plugin
//! directory activates the registered module of the same name, which keeps
//! the directory-driven discovery contract without dynamic linking.

use std::collections::HashMap;
use std::path::Path;

use crate::error::PluginError;
use crate::validators::Validator;

/// Constructor for an exported validator type.
pub type ValidatorConstructor = fn() -> Result<Box<dyn Validator>, PluginError>;

/// A validator type exported by a plugin module.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorExport {
    /// Type name used in diagnostics.
    pub type_name: &'static str,
    /// Instantiates the validator.
    pub construct: ValidatorConstructor,
}

/// A loaded plugin module.
#[derive(Debug, Clone)]
pub struct PluginModule {
    /// Module name.
    pub name: String,
    /// Validator types the module exports.
    pub exports: Vec<ValidatorExport>,
}

/// Loads plugin modules from candidate files.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ModuleLoadFailed`] when the file is unreadable,
    /// corrupt, or names no known module.
    fn load(&self, path: &Path) -> Result<PluginModule, PluginError>;
}

/// Compile-time module registry keyed by file stem, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleLoader {
    modules: HashMap<String, Vec<ValidatorExport>>,
}

impl StaticModuleLoader {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bundled modules.
    #[must_use]
    pub fn with_bundled() -> Self {
        super::bundled::register(Self::new())
    }

    /// Registers a module under `name`.
    #[must_use]
    pub fn register(mut self, name: &str, exports: Vec<ValidatorExport>) -> Self {
        self.modules.insert(name.to_lowercase(), exports);
        self
    }

    /// Names of the registered modules, sorted.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, path: &Path) -> Result<PluginModule, PluginError> {
        let load_failed = |reason: String| PluginError::ModuleLoadFailed {
            path: path.to_path_buf(),
            reason,
        };

        let metadata = std::fs::metadata(path).map_err(|e| load_failed(e.to_string()))?;
        if metadata.len() == 0 {
            return Err(load_failed("empty module image".to_string()));
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| load_failed("module file name is not valid UTF-8".to_string()))?;

        let exports = self
            .modules
            .get(&stem)
            .ok_or_else(|| load_failed(format!("no module named '{stem}' is registered")))?;

        Ok(PluginModule {
            name: stem,
            exports: exports.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
