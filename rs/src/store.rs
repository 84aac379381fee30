//! Core catalog implementation

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for a repository
pub type RepoId = String;

/// Errors produced by catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An explicitly named repository does not exist
    #[error("no repository named '{0}' in the catalog")]
    NotFound(String),

    /// A repository with this name already exists
    #[error("repository '{0}' already exists")]
    DuplicateName(String),

    /// Filesystem error opening or creating the store
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying database error
    #[error("catalog database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One managed repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    /// Stable identifier
    pub id: RepoId,
    /// Human-readable unique name
    pub name: String,
    /// Untracked repositories are never scheduled
    pub tracked: bool,
    /// Minimum interval between pulls, in seconds (None = global default)
    pub pull_interval_secs: Option<u64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One pending urgent-update signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Repository the signal refers to
    pub repo_id: RepoId,
    /// When the signal was raised
    pub raised_at: DateTime<Utc>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS repos (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL UNIQUE,
    tracked            INTEGER NOT NULL DEFAULT 1,
    pull_interval_secs INTEGER,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS urgent_signals (
    repo_id   TEXT NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
    raised_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_signals_repo ON urgent_signals(repo_id);
";

/// The repository catalog
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        debug!(?path, "Opened catalog");
        Ok(Self { conn })
    }

    /// Open an in-memory catalog (testing)
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Add a repository to the catalog
    ///
    /// New repositories start tracked. Fails with `DuplicateName` if the
    /// name is already in use.
    pub fn add_repo(&self, name: &str, pull_interval_secs: Option<u64>) -> Result<RepoRecord, CatalogError> {
        if self.find_id(name)?.is_some() {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }

        let record = RepoRecord {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            tracked: true,
            pull_interval_secs,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO repos (id, name, tracked, pull_interval_secs, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.name,
                record.tracked as i64,
                record.pull_interval_secs.map(|s| s as i64),
                record.created_at.to_rfc3339(),
            ],
        )?;

        info!(name, id = %record.id, "Added repository");
        Ok(record)
    }

    /// Remove a repository and its pending signals
    pub fn remove_repo(&self, name: &str) -> Result<(), CatalogError> {
        let id = self.require_id(name)?;
        self.conn
            .execute("DELETE FROM repos WHERE id = ?1", params![id])?;
        info!(name, "Removed repository");
        Ok(())
    }

    /// Mark a repository as tracked or untracked
    pub fn set_tracked(&self, name: &str, tracked: bool) -> Result<(), CatalogError> {
        let id = self.require_id(name)?;
        self.conn.execute(
            "UPDATE repos SET tracked = ?1 WHERE id = ?2",
            params![tracked as i64, id],
        )?;
        debug!(name, tracked, "Updated tracked flag");
        Ok(())
    }

    /// Set or clear a repository's pull interval
    pub fn set_interval(&self, name: &str, secs: Option<u64>) -> Result<(), CatalogError> {
        let id = self.require_id(name)?;
        self.conn.execute(
            "UPDATE repos SET pull_interval_secs = ?1 WHERE id = ?2",
            params![secs.map(|s| s as i64), id],
        )?;
        debug!(name, ?secs, "Updated pull interval");
        Ok(())
    }

    /// List every repository in the catalog, ordered by name
    pub fn list_repos(&self) -> Result<Vec<RepoRecord>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, tracked, pull_interval_secs, created_at FROM repos ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_repo)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Resolve repository handles by name
    ///
    /// `None` resolves every repository. When names are given, each one must
    /// exist; the first unresolvable name fails the call with `NotFound`.
    pub fn resolve(&self, names: Option<&[String]>) -> Result<Vec<RepoRecord>, CatalogError> {
        let Some(names) = names else {
            return self.list_repos();
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, name, tracked, pull_interval_secs, created_at FROM repos WHERE name = ?1",
        )?;

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let record = stmt
                .query_row(params![name], row_to_repo)
                .optional()?
                .ok_or_else(|| CatalogError::NotFound(name.clone()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Raise an urgent-update signal for a repository
    pub fn raise_signal(&self, name: &str) -> Result<(), CatalogError> {
        let id = self.require_id(name)?;
        self.conn.execute(
            "INSERT INTO urgent_signals (repo_id, raised_at) VALUES (?1, ?2)",
            params![id, Utc::now().to_rfc3339()],
        )?;
        info!(name, "Raised urgent signal");
        Ok(())
    }

    /// List every pending urgent signal
    pub fn pending_signals(&self) -> Result<Vec<SignalRecord>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT repo_id, raised_at FROM urgent_signals ORDER BY raised_at")?;
        let rows = stmt.query_map([], |row| {
            Ok(SignalRecord {
                repo_id: row.get(0)?,
                raised_at: parse_timestamp(row, 1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Clear all pending signals for a repository, returning how many were removed
    pub fn clear_signals(&self, repo_id: &str) -> Result<usize, CatalogError> {
        let removed = self.conn.execute(
            "DELETE FROM urgent_signals WHERE repo_id = ?1",
            params![repo_id],
        )?;
        if removed > 0 {
            debug!(repo_id, removed, "Cleared urgent signals");
        }
        Ok(removed)
    }

    fn find_id(&self, name: &str) -> Result<Option<RepoId>, CatalogError> {
        let id = self
            .conn
            .query_row("SELECT id FROM repos WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn require_id(&self, name: &str) -> Result<RepoId, CatalogError> {
        self.find_id(name)?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

fn row_to_repo(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoRecord> {
    Ok(RepoRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        tracked: row.get::<_, i64>(2)? != 0,
        pull_interval_secs: row.get::<_, Option<i64>>(3)?.map(|s| s as u64),
        created_at: parse_timestamp(row, 4)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::open_in_memory().unwrap()
    }

    #[test]
    fn test_add_and_list() {
        let cat = catalog();
        cat.add_repo("beta", None).unwrap();
        cat.add_repo("alpha", Some(300)).unwrap();

        let repos = cat.list_repos().unwrap();
        assert_eq!(repos.len(), 2);
        // Ordered by name
        assert_eq!(repos[0].name, "alpha");
        assert_eq!(repos[0].pull_interval_secs, Some(300));
        assert_eq!(repos[1].name, "beta");
        assert_eq!(repos[1].pull_interval_secs, None);
        assert!(repos.iter().all(|r| r.tracked));
    }

    #[test]
    fn test_add_duplicate_name_rejected() {
        let cat = catalog();
        cat.add_repo("dup", None).unwrap();

        let err = cat.add_repo("dup", Some(60)).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(ref n) if n == "dup"));
    }

    #[test]
    fn test_resolve_all_and_named() {
        let cat = catalog();
        cat.add_repo("one", None).unwrap();
        cat.add_repo("two", None).unwrap();

        assert_eq!(cat.resolve(None).unwrap().len(), 2);

        let named = cat.resolve(Some(&["two".to_string()])).unwrap();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].name, "two");
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let cat = catalog();
        cat.add_repo("known", None).unwrap();

        let err = cat
            .resolve(Some(&["known".to_string(), "missing".to_string()]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref n) if n == "missing"));
    }

    #[test]
    fn test_tracked_and_interval_updates() {
        let cat = catalog();
        cat.add_repo("repo", None).unwrap();

        cat.set_tracked("repo", false).unwrap();
        cat.set_interval("repo", Some(120)).unwrap();

        let repos = cat.list_repos().unwrap();
        assert!(!repos[0].tracked);
        assert_eq!(repos[0].pull_interval_secs, Some(120));

        cat.set_interval("repo", None).unwrap();
        assert_eq!(cat.list_repos().unwrap()[0].pull_interval_secs, None);
    }

    #[test]
    fn test_update_unknown_repo_fails() {
        let cat = catalog();
        let err = cat.set_tracked("ghost", true).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_signal_lifecycle() {
        let cat = catalog();
        let repo = cat.add_repo("sig", None).unwrap();

        cat.raise_signal("sig").unwrap();
        cat.raise_signal("sig").unwrap();

        let pending = cat.pending_signals().unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|s| s.repo_id == repo.id));

        let removed = cat.clear_signals(&repo.id).unwrap();
        assert_eq!(removed, 2);
        assert!(cat.pending_signals().unwrap().is_empty());
    }

    #[test]
    fn test_signal_for_unknown_repo_fails() {
        let cat = catalog();
        let err = cat.raise_signal("ghost").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref n) if n == "ghost"));
    }

    #[test]
    fn test_remove_repo_cascades_signals() {
        let cat = catalog();
        cat.add_repo("doomed", None).unwrap();
        cat.raise_signal("doomed").unwrap();

        cat.remove_repo("doomed").unwrap();

        assert!(cat.list_repos().unwrap().is_empty());
        assert!(cat.pending_signals().unwrap().is_empty());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let cat = Catalog::open(&path).unwrap();
            cat.add_repo("persisted", Some(60)).unwrap();
        }

        let cat = Catalog::open(&path).unwrap();
        let repos = cat.list_repos().unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "persisted");
        assert_eq!(repos[0].pull_interval_secs, Some(60));
    }
}
