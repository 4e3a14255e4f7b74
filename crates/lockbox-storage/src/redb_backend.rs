//! Durable redb storage backend.
//!
//! redb is a pure-Rust, copy-on-write B-tree. Every `put` and `delete` runs
//! in its own write transaction committed with immediate durability, which
//! gives the per-key atomicity and crash consistency the engine relies on
//! without rewriting the whole dataset on each mutation.
//!
//! redb is synchronous, so every call is moved onto Tokio's blocking pool.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, warn};

use crate::{StorageBackend, StorageError};

/// Single table holding every key. Namespacing (`core/`, `secret/`) lives
/// in the key itself.
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// A storage backend persisted to a single redb file.
///
/// Cheap to clone; clones share the open database handle.
///
/// # Examples
///
/// ```no_run
/// # use lockbox_storage::RedbBackend;
/// let backend = RedbBackend::open("/var/lib/lockbox/lockbox.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbBackend {
    /// Open the database file at `path`, creating it (and its parent
    /// directories) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the directory or file cannot be
    /// created, or the file is not a valid redb database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let open_err = |reason: String| {
            warn!(path = %path.display(), %reason, "failed to open redb database");
            StorageError::Open {
                path: path.display().to_string(),
                reason,
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
        }

        let db = Database::create(path).map_err(|e| open_err(e.to_string()))?;

        // Create the table up front so read transactions never see it missing.
        let txn = db.begin_write().map_err(txn_err)?;
        txn.open_table(ENTRIES).map_err(txn_err)?;
        txn.commit().map_err(txn_err)?;

        debug!(path = %path.display(), "redb database opened");
        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Filesystem path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StorageError::Transaction {
                reason: format!("blocking storage task failed: {e}"),
            })?
    }
}

fn txn_err(e: impl Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(txn_err)?;
            let table = txn.open_table(ENTRIES).map_err(txn_err)?;
            let value = table.get(key.as_str()).map_err(|e| StorageError::Read {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Ok(value.map(|v| v.value().to_vec()))
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_owned();
        let value = value.to_vec();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            {
                let mut table = txn.open_table(ENTRIES).map_err(txn_err)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| StorageError::Write {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(|e| StorageError::Write {
                key,
                reason: e.to_string(),
            })
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            let removed = {
                let mut table = txn.open_table(ENTRIES).map_err(txn_err)?;
                table
                    .remove(key.as_str())
                    .map_err(|e| StorageError::Delete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?
                    .is_some()
            };
            txn.commit().map_err(|e| StorageError::Delete {
                key,
                reason: e.to_string(),
            })?;
            Ok(removed)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.to_owned();
        self.blocking(move |db| {
            let list_err = |e: &dyn Display| StorageError::List {
                prefix: prefix.clone(),
                reason: e.to_string(),
            };
            let txn = db.begin_read().map_err(txn_err)?;
            let table = txn.open_table(ENTRIES).map_err(txn_err)?;

            let mut keys = Vec::new();
            for item in table.range(prefix.as_str()..).map_err(|e| list_err(&e))? {
                let (k, _) = item.map_err(|e| list_err(&e))?;
                let key = k.value();
                if !key.starts_with(prefix.as_str()) {
                    break;
                }
                keys.push(key.to_owned());
            }
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open_in(dir: &tempfile::TempDir) -> RedbBackend {
        RedbBackend::open(dir.path().join("nested").join("lockbox.redb")).unwrap()
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_in(&dir);
        assert!(backend.path().exists());
    }

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_in(&dir);

        backend.put("secret/app", b"blob").await.unwrap();
        assert_eq!(backend.get("secret/app").await.unwrap(), Some(b"blob".to_vec()));
        assert!(backend.exists("secret/app").await.unwrap());

        assert!(backend.delete("secret/app").await.unwrap());
        assert!(!backend.delete("secret/app").await.unwrap());
        assert_eq!(backend.get("secret/app").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_stops_at_prefix_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open_in(&dir);

        backend.put("core/root-token", b"d").await.unwrap();
        backend.put("secret/app/db", b"1").await.unwrap();
        backend.put("secret/app/api", b"2").await.unwrap();
        backend.put("secret/other", b"3").await.unwrap();

        let keys = backend.list("secret/app/").await.unwrap();
        assert_eq!(keys, vec!["secret/app/api", "secret/app/db"]);
        assert!(backend.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = open_in(&dir);
            backend.put("core/unseal-key", b"verifier").await.unwrap();
        }
        let reopened = open_in(&dir);
        assert_eq!(
            reopened.get("core/unseal-key").await.unwrap(),
            Some(b"verifier".to_vec())
        );
    }

    #[test]
    fn open_rejects_a_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = RedbBackend::open(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::Open { .. }));
    }
}
