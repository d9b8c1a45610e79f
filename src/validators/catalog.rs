//! Validator catalog.
//!
//! Resolves validator-type strings from rules to shared validator instances.
//! The built-in set is constructed eagerly; plugin validators discovered at
//! startup are merged in afterwards. Lookups ignore case, and the first
//! registration of an id wins, so plugins can never shadow a built-in.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{Validator, builtin_validators};
use crate::error::{PluginError, ValidatorError};
use crate::plugins::{ModuleLoader, PluginDiscovery};

/// Maximum edit distance for "did you mean" suggestions.
const SUGGESTION_DISTANCE: usize = 3;

/// Registry of validators keyed by lower-cased id.
#[derive(Debug, Clone)]
pub struct ValidatorCatalog {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl Default for ValidatorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ValidatorCatalog {
    /// Catalog holding only the built-in validators.
    #[must_use]
    pub fn builtin() -> Self {
        let (catalog, rejected) = Self::from_validators(builtin_validators());
        for e in &rejected {
            error!(error = %e, "built-in validator rejected");
        }
        debug_assert!(rejected.is_empty(), "built-in ids must be distinct: {rejected:?}");
        catalog
    }

    /// Registers `validators` in order, returning the catalog and every
    /// registration that was refused.
    fn from_validators(
        validators: impl IntoIterator<Item = Arc<dyn Validator>>,
    ) -> (Self, Vec<PluginError>) {
        let mut catalog = Self {
            validators: HashMap::new(),
        };
        let rejected = validators
            .into_iter()
            .filter_map(|validator| catalog.register(validator).err())
            .collect();
        (catalog, rejected)
    }

    /// Catalog holding the built-ins plus every plugin validator found in
    /// `directories`.
    ///
    /// Discovery problems are logged and skipped; they never reduce the
    /// built-in set.
    #[must_use]
    pub fn discover(directories: &[PathBuf], loader: &dyn ModuleLoader) -> Self {
        let mut catalog = Self::builtin();
        let existing = catalog.validators.keys().cloned().collect();
        let discovered = PluginDiscovery::new(loader).discover(directories, &existing);

        for validator in discovered.into_values() {
            if let Err(e) = catalog.register(validator) {
                warn!(error = %e, "skipping discovered validator");
            }
        }

        debug!(
            validators = catalog.len(),
            "validator catalog ready"
        );
        catalog
    }

    /// Registers a validator under its declared id.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::EmptyId`] for a blank id and
    /// [`PluginError::DuplicateId`] when the id (ignoring case) is taken.
    pub fn register(&mut self, validator: Arc<dyn Validator>) -> Result<(), PluginError> {
        let id = validator.id().trim().to_lowercase();
        if id.is_empty() {
            return Err(PluginError::EmptyId {
                type_name: format!("{validator:?}"),
            });
        }
        if self.validators.contains_key(&id) {
            return Err(PluginError::DuplicateId {
                id: validator.id().to_string(),
            });
        }
        self.validators.insert(id, validator);
        Ok(())
    }

    /// Looks up a validator by type name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::UnknownType`] listing every supported id.
    pub fn get_validator(&self, type_name: &str) -> Result<Arc<dyn Validator>, ValidatorError> {
        let wanted = type_name.trim().to_lowercase();
        if let Some(validator) = self.validators.get(&wanted) {
            return Ok(Arc::clone(validator));
        }

        let supported: Vec<String> = self.supported_validators().into_iter().collect();
        let suggestion = supported
            .iter()
            .map(|id| (id, strsim::damerau_levenshtein(&wanted, &id.to_lowercase())))
            .filter(|(_, dist)| *dist <= SUGGESTION_DISTANCE)
            .min_by_key(|(_, dist)| *dist)
            .map(|(id, _)| id.clone());

        Err(ValidatorError::UnknownType {
            requested: type_name.to_string(),
            supported,
            suggestion,
        })
    }

    /// Declared ids of every registered validator.
    #[must_use]
    pub fn supported_validators(&self) -> BTreeSet<String> {
        self.validators
            .values()
            .map(|v| v.id().to_string())
            .collect()
    }

    /// Returns `true` if `type_name` resolves, ignoring case.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.validators.contains_key(&type_name.trim().to_lowercase())
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
