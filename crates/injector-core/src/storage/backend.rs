//! Document storage backend.
//!
//! Documents are addressed by [`DocumentKey`] and stored as whole files under
//! `<root>/config`. There is no caching at this layer: every call touches the
//! filesystem. The in-memory cache lives in [`crate::ConfigStore`].

use crate::config::{PathsConfig, SchemaConfig};
use crate::storage::atomic::{atomic_write, read_bytes};
use crate::{InjectorError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Logical documents persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    Settings,
    Preferences,
    Libraries,
    Apps,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 4] = [
        DocumentKey::Settings,
        DocumentKey::Preferences,
        DocumentKey::Libraries,
        DocumentKey::Apps,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKey::Settings => PathsConfig::SETTINGS_FILENAME,
            DocumentKey::Preferences => PathsConfig::PREFERENCES_FILENAME,
            DocumentKey::Libraries => PathsConfig::LIBRARIES_FILENAME,
            DocumentKey::Apps => PathsConfig::APPS_FILENAME,
        }
    }

    /// Whether the previous version is kept as `<name>.bak` on every write.
    fn keeps_backup(&self) -> bool {
        matches!(self, DocumentKey::Settings | DocumentKey::Apps)
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Byte-level persistence used by the store.
///
/// Implementations must make `write_document` atomic with respect to
/// concurrent readers, including readers in other processes.
pub trait DocumentStore: Send + Sync {
    /// Idempotently create everything later operations need.
    fn ensure_layout(&self) -> Result<()>;

    /// Read a document; `None` when it has never been written.
    fn read_document(&self, key: DocumentKey) -> Result<Option<Vec<u8>>>;

    /// Replace a document.
    fn write_document(&self, key: DocumentKey, bytes: &[u8]) -> Result<()>;
}

/// Filesystem-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(PathsConfig::CONFIG_DIR_NAME)
    }

    /// Directory holding the managed copies of imported libraries.
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join(PathsConfig::LIBRARIES_DIR_NAME)
    }

    pub fn document_path(&self, key: DocumentKey) -> PathBuf {
        self.config_dir().join(key.file_name())
    }
}

impl DocumentStore for FsDocumentStore {
    fn ensure_layout(&self) -> Result<()> {
        for dir in [self.config_dir(), self.libraries_dir()] {
            if !dir.is_dir() {
                fs::create_dir_all(&dir).map_err(|e| InjectorError::Storage {
                    message: format!("Failed to create directory {}", dir.display()),
                    path: Some(dir.clone()),
                    source: Some(e),
                })?;
                debug!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    fn read_document(&self, key: DocumentKey) -> Result<Option<Vec<u8>>> {
        let path = self.document_path(key);
        debug!("Loading {} from {}", key, path.display());
        read_bytes(&path)
    }

    fn write_document(&self, key: DocumentKey, bytes: &[u8]) -> Result<()> {
        let path = self.document_path(key);
        debug!("Saving {} to {}", key, path.display());
        atomic_write(&path, bytes, key.keeps_backup())
    }
}

/// Outcome of loading a JSON document.
#[derive(Debug)]
pub enum Loaded<T> {
    /// The document has never been written.
    Missing,
    Parsed(T),
    /// The document exists but could not be parsed; carries the parse error text.
    Corrupt(String),
}

/// Read and parse a JSON document.
///
/// Parse failures are reported as [`Loaded::Corrupt`], not as errors; only
/// filesystem failures are errors.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    key: DocumentKey,
) -> Result<Loaded<T>> {
    let Some(bytes) = store.read_document(key)? else {
        return Ok(Loaded::Missing);
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Loaded::Parsed(value)),
        Err(e) => Ok(Loaded::Corrupt(e.to_string())),
    }
}

/// Serialize and persist a JSON document.
pub fn save_json<T: Serialize>(
    store: &dyn DocumentStore,
    key: DocumentKey,
    data: &T,
) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(data).map_err(|e| InjectorError::Json {
        message: format!("Failed to serialize {}: {}", key, e),
        source: Some(e),
    })?;
    store.write_document(key, &serialized)
}

/// serde default for `schemaVersion` fields.
pub(crate) fn current_schema_version() -> u32 {
    SchemaConfig::CURRENT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        value: u32,
    }

    fn create_test_store() -> (FsDocumentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(temp_dir.path().join("root"));
        store.ensure_layout().unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_ensure_layout_is_idempotent() {
        let (store, _temp) = create_test_store();
        store.ensure_layout().unwrap();
        assert!(store.config_dir().is_dir());
        assert!(store.libraries_dir().is_dir());
    }

    #[test]
    fn test_document_paths_live_under_config_dir() {
        let (store, _temp) = create_test_store();
        for key in DocumentKey::ALL {
            let path = store.document_path(key);
            assert!(path.starts_with(store.config_dir()));
            assert!(path.ends_with(key.file_name()));
        }
    }

    #[test]
    fn test_missing_document_reads_none() {
        let (store, _temp) = create_test_store();
        assert!(store.read_document(DocumentKey::Apps).unwrap().is_none());
        let loaded: Loaded<Doc> = load_json(&store, DocumentKey::Apps).unwrap();
        assert!(matches!(loaded, Loaded::Missing));
    }

    #[test]
    fn test_save_and_load_json() {
        let (store, _temp) = create_test_store();
        save_json(&store, DocumentKey::Settings, &Doc { value: 7 }).unwrap();

        let loaded: Loaded<Doc> = load_json(&store, DocumentKey::Settings).unwrap();
        assert!(matches!(loaded, Loaded::Parsed(Doc { value: 7 })));
    }

    #[test]
    fn test_corrupt_document_is_reported_not_raised() {
        let (store, _temp) = create_test_store();
        store
            .write_document(DocumentKey::Libraries, b"\x00not json")
            .unwrap();

        let loaded: Loaded<Doc> = load_json(&store, DocumentKey::Libraries).unwrap();
        assert!(matches!(loaded, Loaded::Corrupt(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_layout_fails_on_read_only_parent() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let store = FsDocumentStore::new(locked.join("root"));
        let result = store.ensure_layout();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Running as root bypasses permission bits, so only check the error shape.
        if let Err(err) = result {
            assert!(err.is_storage_error());
        }
    }
}
