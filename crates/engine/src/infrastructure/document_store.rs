//! Filesystem document store.
//!
//! Atomic read/write of versioned JSON documents plus advisory per-path
//! exclusive locks. Writes go through a temp file and an atomic rename, so a
//! crash mid-write leaves the previous complete document readable.
//! Unparseable documents are quarantined (renamed beside the original) and
//! surface as `Corrupt`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Version conflict on {path}: expected {expected}, found {actual}")]
    VersionConflict {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),
    #[error("Corrupt document quarantined: {0}")]
    Corrupt(String),
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("Serialization error on {path}: {message}")]
    Serialization { path: String, message: String },
}

impl StoreError {
    fn io(path: &str, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for wayfarer_domain::GameError {
    fn from(err: StoreError) -> Self {
        use wayfarer_domain::GameError;
        match err {
            StoreError::NotFound(path) => GameError::NotFound(path),
            StoreError::VersionConflict { path, .. } => GameError::Conflict(path),
            StoreError::LockTimeout(path) => GameError::LockTimeout(path),
            StoreError::Corrupt(path) => GameError::Corrupt(path),
            StoreError::Io { path, message } | StoreError::Serialization { path, message } => {
                GameError::internal(format!("{path}: {message}"))
            }
        }
    }
}

/// Guard for an advisory per-document lock. Dropping it releases the lock on
/// every exit path.
#[derive(Debug)]
pub struct DocLock {
    _guard: OwnedMutexGuard<()>,
}

/// Atomic JSON document store rooted at a directory. Logical document paths
/// are relative, `/`-separated, and always end in `.json`.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Acquire the advisory exclusive lock for a logical path, bounded by
    /// `timeout`.
    pub async fn with_lock(&self, rel: &str, timeout: Duration) -> Result<DocLock, StoreError> {
        let mutex = self
            .locks
            .entry(rel.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(DocLock { _guard: guard }),
            Err(_) => Err(StoreError::LockTimeout(rel.to_string())),
        }
    }

    pub async fn exists(&self, rel: &str) -> bool {
        tokio::fs::try_exists(self.absolute(rel)).await.unwrap_or(false)
    }

    /// Read and parse a document. A document that exists but does not parse
    /// is renamed to `<name>.corrupt.<unix-ts>` and reported as `Corrupt`.
    pub async fn read_value(&self, rel: &str) -> Result<Value, StoreError> {
        let path = self.absolute(rel);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(rel.to_string()))
            }
            Err(err) => return Err(StoreError::io(rel, err)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(parse_err) => {
                let quarantine = format!("{rel}.corrupt.{}", chrono::Utc::now().timestamp());
                tracing::warn!(
                    "Quarantining corrupt document {} -> {}: {}",
                    rel,
                    quarantine,
                    parse_err
                );
                if let Err(rename_err) =
                    tokio::fs::rename(&path, self.absolute(&quarantine)).await
                {
                    tracing::error!("Failed to quarantine {}: {}", rel, rename_err);
                }
                Err(StoreError::Corrupt(rel.to_string()))
            }
        }
    }

    pub async fn read<T: DeserializeOwned>(&self, rel: &str) -> Result<T, StoreError> {
        let value = self.read_value(rel).await?;
        serde_json::from_value(value).map_err(|err| StoreError::Serialization {
            path: rel.to_string(),
            message: err.to_string(),
        })
    }

    /// The stored document's `metadata._version`, or `None` when the
    /// document does not exist.
    pub async fn current_version(&self, rel: &str) -> Result<Option<u64>, StoreError> {
        match self.read_value(rel).await {
            Ok(value) => Ok(value
                .get("metadata")
                .and_then(|m| m.get("_version"))
                .and_then(Value::as_u64)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write a document atomically. With `expected_version`, the write only
    /// lands if the stored document's version still matches; otherwise it
    /// fails with `VersionConflict` and writes nothing.
    pub async fn write<T: Serialize>(
        &self,
        rel: &str,
        doc: &T,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        if let Some(expected) = expected_version {
            let actual = self.current_version(rel).await?.unwrap_or(0);
            if actual != expected {
                return Err(StoreError::VersionConflict {
                    path: rel.to_string(),
                    expected,
                    actual,
                });
            }
        }

        let path = self.absolute(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::io(rel, err))?;
        }

        let serialized =
            serde_json::to_vec_pretty(doc).map_err(|err| StoreError::Serialization {
                path: rel.to_string(),
                message: err.to_string(),
            })?;

        // Temp file + atomic rename keeps the previous document intact
        // through a crash mid-write.
        let temp = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp, &serialized)
            .await
            .map_err(|err| StoreError::io(rel, err))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|err| StoreError::io(rel, err))?;
        Ok(())
    }

    /// Names of immediate entries (files and directories) under a prefix
    /// directory. Missing prefix reads as empty.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.absolute(prefix);
        let mut entries = Vec::new();
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(StoreError::io(prefix, err)),
        };
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| StoreError::io(prefix, err))?
        {
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Delete a document. Returns whether it existed.
    pub async fn delete(&self, rel: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.absolute(rel)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::io(rel, err)),
        }
    }

    /// Delete a whole subtree (used for isolated player worlds on reset).
    pub async fn delete_tree(&self, prefix: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_dir_all(self.absolute(prefix)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(prefix, err)),
        }
    }

    /// Copy a document byte-for-byte (used for reset backups).
    pub async fn copy(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let target = self.absolute(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::io(to, err))?;
        }
        tokio::fs::copy(self.absolute(from), target)
            .await
            .map_err(|err| StoreError::io(from, err))?;
        Ok(())
    }
}
