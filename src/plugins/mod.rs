//! Validator plugin discovery.
//!
//! Scans plugin directories (non-recursively) for candidate module files,
//! loads each through a [`ModuleLoader`], instantiates every exported
//! validator type, and returns the validators keyed by lower-cased id.
//!
//! Discovery never fails outward. A missing directory, an unloadable
//! module, a constructor error, a blank id, or a duplicate id is logged as
//! a warning and only that item is skipped.
//!
//! ```text
//! dirs ─► candidate files ─► ModuleLoader::load ─► exports ─► construct ─► id checks ─► map
//! ```

mod bundled;
mod loader;

pub use bundled::{RegexValidator, StartsWithValidator, TEXT_PATTERNS_MODULE};
pub use loader::{
    ModuleLoader, PluginModule, StaticModuleLoader, ValidatorConstructor, ValidatorExport,
};

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::PluginError;
use crate::observability::metrics;
use crate::validators::Validator;

/// File extensions treated as plugin modules.
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["so", "dylib", "dll", "plugin"];

/// Discovers plugin validators in a set of directories.
pub struct PluginDiscovery<'a> {
    loader: &'a dyn ModuleLoader,
    extensions: Vec<String>,
}

impl<'a> PluginDiscovery<'a> {
    /// Creates a discovery pass using `loader` and the default extensions.
    #[must_use]
    pub fn new(loader: &'a dyn ModuleLoader) -> Self {
        Self {
            loader,
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replaces the candidate file extensions (matched ignoring case).
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Runs discovery over `directories`.
    ///
    /// `existing` holds the lower-cased ids already registered; validators
    /// declaring one of them are skipped, as are later duplicates within
    /// this pass.
    #[must_use]
    pub fn discover(
        &self,
        directories: &[PathBuf],
        existing: &HashSet<String>,
    ) -> HashMap<String, Arc<dyn Validator>> {
        let mut found: HashMap<String, Arc<dyn Validator>> = HashMap::new();

        for dir in directories {
            let candidates = match self.candidates(dir) {
                Ok(candidates) => candidates,
                Err(e) => {
                    skip(&e);
                    continue;
                }
            };

            debug!(
                dir = %dir.display(),
                candidates = candidates.len(),
                "scanning plugin directory"
            );

            for path in candidates {
                let module = match self.loader.load(&path) {
                    Ok(module) => module,
                    Err(e) => {
                        skip(&e);
                        continue;
                    }
                };

                for export in &module.exports {
                    match instantiate(export, existing, &found) {
                        Ok((id, validator)) => {
                            info!(
                                id = %validator.id(),
                                module = %module.name,
                                path = %path.display(),
                                "registered plugin validator"
                            );
                            found.insert(id, validator);
                        }
                        Err(e) => skip(&e),
                    }
                }
            }
        }

        found
    }

    /// Lists candidate module files in `dir`, sorted by file name.
    fn candidates(&self, dir: &Path) -> Result<Vec<PathBuf>, PluginError> {
        if !dir.is_dir() {
            return Err(PluginError::DirectoryNotFound(dir.to_path_buf()));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| PluginError::ModuleLoadFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && self.is_candidate(path))
            .collect();
        candidates.sort();
        Ok(candidates)
    }

    fn is_candidate(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|c| c.eq_ignore_ascii_case(ext)))
    }
}

/// Constructs one export and checks its declared id.
fn instantiate(
    export: &ValidatorExport,
    existing: &HashSet<String>,
    found: &HashMap<String, Arc<dyn Validator>>,
) -> Result<(String, Arc<dyn Validator>), PluginError> {
    let validator = catch_unwind(AssertUnwindSafe(export.construct))
        .map_err(|_| PluginError::InstantiationFailed {
            type_name: export.type_name.to_string(),
            reason: "constructor panicked".to_string(),
        })??;

    let id = validator.id().trim().to_lowercase();
    if id.is_empty() {
        return Err(PluginError::EmptyId {
            type_name: export.type_name.to_string(),
        });
    }
    if existing.contains(&id) || found.contains_key(&id) {
        return Err(PluginError::DuplicateId {
            id: validator.id().to_string(),
        });
    }

    Ok((id, Arc::from(validator)))
}

fn skip(error: &PluginError) {
    warn!(error = %error, "skipping plugin");
    metrics::record_plugin_skipped(error.reason_label());
}

// ============================================================================
// Tests
// ============================================================================
