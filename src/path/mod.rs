//! Sandboxed path resolution.
//!
//! Maps the settings-file reference of an environment onto an absolute path
//! that is guaranteed to lie inside the directory of the rule document.
//!
//! Resolution steps:
//! 1. Reject an empty base (programming error) and oversized inputs.
//! 2. Pass an empty reference through unchanged.
//! 3. Join relative references onto the base directory; take absolute
//!    references as-is.
//! 4. Normalize `.`/`..` lexically, then canonicalize the longest existing
//!    prefix so symbolic links are replaced by their real targets. Dangling
//!    links are followed through `read_link` so their eventual target is
//!    checked too.
//! 5. Require the canonical result to sit inside the canonical base.
//!
//! Results are cached per `(path, base)` pair. A cache hit is re-resolved
//! and re-checked before it is returned, so a symlink swapped or created
//! after caching cannot smuggle a path out of the sandbox.

mod cache;

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SecurityLimits;
use crate::error::PathError;
use crate::observability::metrics;

use cache::PathCache;

/// Symbolic links followed before giving up on a chain (matches Linux `MAXSYMLINKS`).
const MAX_LINK_HOPS: usize = 40;

/// Resolves path references inside a base directory.
#[derive(Debug)]
pub struct PathResolver {
    cache: PathCache,
    max_path_length: usize,
    case_insensitive: bool,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(&SecurityLimits::default())
    }
}

impl PathResolver {
    /// Creates a resolver sized by `limits`.
    ///
    /// Containment checks ignore case on platforms whose default filesystems
    /// are case-insensitive.
    #[must_use]
    pub fn new(limits: &SecurityLimits) -> Self {
        Self {
            cache: PathCache::new(limits.max_path_cache_size),
            max_path_length: limits.max_path_length,
            case_insensitive: cfg!(any(windows, target_os = "macos")),
        }
    }

    /// Overrides case sensitivity of the containment check.
    #[must_use]
    pub const fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Resolves `path` against the directory of `base_path`.
    ///
    /// `base_path` may name a directory or a file inside one (typically the
    /// rule document); in the latter case its parent directory is the
    /// sandbox root.
    ///
    /// # Errors
    ///
    /// - [`PathError::InvalidArgument`] if `base_path` is empty.
    /// - [`PathError::PathTooLong`] if either input exceeds the length limit.
    /// - [`PathError::AccessDenied`] if the result escapes the base directory,
    ///   directly or through a symbolic link.
    /// - [`PathError::Io`] if the working directory cannot be determined.
    pub fn resolve_path(&self, path: &str, base_path: &str) -> Result<PathBuf, PathError> {
        if base_path.trim().is_empty() {
            return Err(PathError::InvalidArgument(
                "base path must not be empty".to_string(),
            ));
        }
        self.check_length(base_path)?;

        if path.is_empty() {
            return Ok(PathBuf::new());
        }
        self.check_length(path)?;

        let base_dir = base_directory(base_path)?;

        if let Some(cached) = self.cache.get(path, base_path) {
            if resolve_links(&cached).0 == cached
                && is_within(&cached, &base_dir, self.case_insensitive)
            {
                metrics::record_path_cache("hit");
                return Ok(cached);
            }
            debug!(path, base = base_path, "cached resolution no longer valid");
            metrics::record_path_cache("stale");
            self.cache.remove(path, base_path);
        } else {
            metrics::record_path_cache("miss");
        }

        let resolved = self.compute(path, &base_dir)?;
        self.cache.insert(path, base_path, &resolved);
        Ok(resolved)
    }

    fn compute(&self, path: &str, base_dir: &Path) -> Result<PathBuf, PathError> {
        let reference = Path::new(path);
        let joined = if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            base_dir.join(reference)
        };

        let normalized = normalize_lexically(&joined);
        let (resolved, followed_dangling) = resolve_links(&normalized);

        let is_link = followed_dangling
            || std::fs::symlink_metadata(&normalized)
                .is_ok_and(|meta| meta.file_type().is_symlink());
        if is_link {
            debug!(
                link = %normalized.display(),
                target = %resolved.display(),
                "resolved symbolic link"
            );
        }

        if !is_within(&resolved, base_dir, self.case_insensitive) {
            warn!(
                path,
                resolved = %resolved.display(),
                base = %base_dir.display(),
                symlink = is_link,
                "path escapes base directory"
            );
            metrics::record_security_denial(if is_link { "symlink_escape" } else { "path_escape" });
            return Err(PathError::AccessDenied {
                path: path.to_string(),
                base: base_dir.to_path_buf(),
            });
        }

        Ok(resolved)
    }

    fn check_length(&self, input: &str) -> Result<(), PathError> {
        if input.len() > self.max_path_length {
            metrics::record_security_denial("path_too_long");
            return Err(PathError::PathTooLong {
                length: input.len(),
                limit: self.max_path_length,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Canonical sandbox root for `base_path`.
fn base_directory(base_path: &str) -> Result<PathBuf, PathError> {
    let base = Path::new(base_path);
    let absolute = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| PathError::Io {
                path: base.to_path_buf(),
                source,
            })?
            .join(base)
    };
    let absolute = normalize_lexically(&absolute);

    let dir = if absolute.is_dir() {
        absolute
    } else {
        absolute
            .parent()
            .map_or_else(|| absolute.clone(), Path::to_path_buf)
    };

    Ok(canonicalize_lenient(&dir))
}

/// Resolves `.` and `..` without touching the filesystem. `..` never climbs
/// above the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalizes the longest existing prefix of an absolute, normalized
/// path and re-appends the remainder. Symbolic links along the existing
/// prefix are replaced by their targets.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(canonical) = std::fs::canonicalize(ancestor) {
            return match path.strip_prefix(ancestor) {
                Ok(rest) if rest.as_os_str().is_empty() => canonical,
                Ok(rest) => normalize_lexically(&canonical.join(rest)),
                Err(_) => canonical,
            };
        }
    }
    path.to_path_buf()
}

/// Resolves `path` to the location the OS would eventually open, following
/// dangling links that [`canonicalize_lenient`] cannot see through.
///
/// Returns the resolved path and whether a dangling link was followed.
fn resolve_links(path: &Path) -> (PathBuf, bool) {
    let mut current = canonicalize_lenient(path);
    let mut followed = false;
    for _ in 0..MAX_LINK_HOPS {
        match dangling_link_target(&current) {
            Some(next) => {
                followed = true;
                current = canonicalize_lenient(&next);
            }
            None => break,
        }
    }
    (current, followed)
}

/// Finds the first component of `path` that is a symbolic link and returns
/// the path with that link replaced by its target. Relative targets are
/// taken against the link's parent.
fn dangling_link_target(path: &Path) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    let mut components = path.components();
    while let Some(component) = components.next() {
        prefix.push(component.as_os_str());
        if !matches!(component, Component::Normal(_)) {
            continue;
        }
        if let Ok(target) = std::fs::read_link(&prefix) {
            let target = prefix
                .parent()
                .map_or_else(|| target.clone(), |parent| parent.join(&target));
            return Some(normalize_lexically(&target.join(components.as_path())));
        }
    }
    None
}

/// Component-wise prefix check.
fn is_within(candidate: &Path, base: &Path, case_insensitive: bool) -> bool {
    if !case_insensitive {
        return candidate.starts_with(base);
    }

    let lower = |p: &Path| -> Vec<String> {
        p.components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect()
    };
    lower(candidate).starts_with(&lower(base))
}

// ============================================================================
// Tests
// ============================================================================
