//! Working-set resolution over the repository catalog
//!
//! The scheduler core talks to the catalog through the `RepoDirectory` and
//! `SignalSource` traits so tests can substitute synthetic sets and signal
//! queues. `CatalogDirectory` is the production implementation over
//! `repostore::Catalog`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use repostore::{Catalog, CatalogError, RepoId, RepoRecord, SignalRecord};

/// Errors produced while resolving the working set
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// An explicitly named repository does not exist (fatal to the run)
    #[error("no repository named '{0}'")]
    NotFound(String),

    /// Underlying catalog failure
    #[error(transparent)]
    Catalog(CatalogError),
}

impl From<CatalogError> for DirectoryError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(name) => Self::NotFound(name),
            other => Self::Catalog(other),
        }
    }
}

/// Resolves repository handles, optionally restricted to named repositories
pub trait RepoDirectory: Send + Sync {
    /// Resolve handles by name; `None` means every known repository.
    ///
    /// Fails with [`DirectoryError::NotFound`] if any explicitly named
    /// repository cannot be resolved.
    fn resolve(&self, names: Option<&[String]>) -> Result<Vec<RepoRecord>, DirectoryError>;
}

/// Exposes the pending urgent-update signals
pub trait SignalSource: Send + Sync {
    /// Current set of pending signals; idempotently re-readable.
    fn pending(&self) -> Result<Vec<SignalRecord>, DirectoryError>;

    /// Clear a repository's pending signals after it has been synchronized.
    fn clear(&self, repo_id: &RepoId) -> Result<(), DirectoryError>;
}

/// Catalog-backed implementation of both directory traits
pub struct CatalogDirectory {
    catalog: Mutex<Catalog>,
}

impl CatalogDirectory {
    /// Wrap an already-open catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
        }
    }

    /// Open the catalog at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        Ok(Self::new(Catalog::open(path)?))
    }
}

impl RepoDirectory for CatalogDirectory {
    fn resolve(&self, names: Option<&[String]>) -> Result<Vec<RepoRecord>, DirectoryError> {
        let catalog = self.catalog.lock().expect("catalog mutex poisoned");
        Ok(catalog.resolve(names)?)
    }
}

impl SignalSource for CatalogDirectory {
    fn pending(&self) -> Result<Vec<SignalRecord>, DirectoryError> {
        let catalog = self.catalog.lock().expect("catalog mutex poisoned");
        Ok(catalog.pending_signals()?)
    }

    fn clear(&self, repo_id: &RepoId) -> Result<(), DirectoryError> {
        let catalog = self.catalog.lock().expect("catalog mutex poisoned");
        catalog.clear_signals(repo_id)?;
        Ok(())
    }
}

/// Produce the active working set for one iteration
///
/// An inclusion list restricts the set to the named repositories; an
/// exclusion list removes its members from the result by identifier. Both
/// lists are resolved through the directory, so an unknown name in either
/// fails the call.
pub fn resolve_working_set(
    directory: &dyn RepoDirectory,
    include: Option<&[String]>,
    exclude: &[String],
) -> Result<Vec<RepoRecord>, DirectoryError> {
    let mut working = directory.resolve(include)?;

    if !exclude.is_empty() {
        let excluded = directory.resolve(Some(exclude))?;
        let excluded_ids: HashSet<RepoId> = excluded.into_iter().map(|r| r.id).collect();
        working.retain(|r| !excluded_ids.contains(&r.id));
    }

    debug!(count = working.len(), "resolve_working_set: resolved");
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_with(names: &[&str]) -> CatalogDirectory {
        let catalog = Catalog::open_in_memory().unwrap();
        for name in names {
            catalog.add_repo(name, None).unwrap();
        }
        CatalogDirectory::new(catalog)
    }

    fn names(repos: &[RepoRecord]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_no_include_resolves_all() {
        let dir = directory_with(&["a", "b", "c"]);
        let working = resolve_working_set(&dir, None, &[]).unwrap();
        assert_eq!(names(&working), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_include_restricts_set() {
        let dir = directory_with(&["a", "b", "c"]);
        let include = vec!["b".to_string()];
        let working = resolve_working_set(&dir, Some(&include), &[]).unwrap();
        assert_eq!(names(&working), vec!["b"]);
    }

    #[test]
    fn test_exclude_removes_by_id() {
        let dir = directory_with(&["a", "b", "c"]);
        let exclude = vec!["b".to_string()];
        let working = resolve_working_set(&dir, None, &exclude).unwrap();
        assert_eq!(names(&working), vec!["a", "c"]);
    }

    #[test]
    fn test_unknown_include_name_is_fatal() {
        let dir = directory_with(&["a"]);
        let include = vec!["missing".to_string()];
        let err = resolve_working_set(&dir, Some(&include), &[]).unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(ref n) if n == "missing"));
    }

    #[test]
    fn test_unknown_exclude_name_is_fatal() {
        let dir = directory_with(&["a"]);
        let exclude = vec!["missing".to_string()];
        let err = resolve_working_set(&dir, None, &exclude).unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(ref n) if n == "missing"));
    }

    #[test]
    fn test_signal_roundtrip_through_traits() {
        let catalog = Catalog::open_in_memory().unwrap();
        let repo = catalog.add_repo("sig", None).unwrap();
        catalog.raise_signal("sig").unwrap();
        let dir = CatalogDirectory::new(catalog);

        let pending = dir.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].repo_id, repo.id);

        // Reads are idempotent: the signal is still there
        assert_eq!(dir.pending().unwrap().len(), 1);

        dir.clear(&repo.id).unwrap();
        assert!(dir.pending().unwrap().is_empty());
    }
}
