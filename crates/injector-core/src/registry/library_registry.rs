//! Registry of shared libraries available for injection.
//!
//! The registry owns the `libraries.json` document and the managed copies in
//! `<root>/libraries`. It is not synchronized on its own: the store holds it
//! inside its cache lock and persists every change before committing it.

use crate::config::LimitsConfig;
use crate::models::{LibrariesDocument, LibraryFile, LibraryRef};
use crate::registry::hashing::compute_content_hash;
use crate::registry::naming::normalize_library_name;
use crate::storage::temp_path_for;
use crate::{InjectorError, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Managed copy of a source file, hashed and copied but not yet registered.
#[derive(Debug)]
pub(crate) struct PreparedImport {
    /// Registry entry without a generation; one is assigned when staged.
    candidate: LibraryFile,
    /// Managed copy created by this import, removed again if persisting fails.
    created_file: Option<PathBuf>,
}

/// Result of staging an import, before the registry document is persisted.
#[derive(Debug)]
pub(crate) struct StagedImport {
    pub entry: LibraryFile,
    /// `None` when the library was already registered and nothing changes.
    pub next_document: Option<LibrariesDocument>,
    pub created_file: Option<PathBuf>,
}

/// In-memory view of the library registry.
#[derive(Debug, Clone)]
pub struct LibraryRegistry {
    libraries_dir: PathBuf,
    document: LibrariesDocument,
}

impl LibraryRegistry {
    pub fn new(libraries_dir: impl Into<PathBuf>, document: LibrariesDocument) -> Self {
        Self {
            libraries_dir: libraries_dir.into(),
            document: document.normalized(),
        }
    }

    pub fn libraries_dir(&self) -> &Path {
        &self.libraries_dir
    }

    pub fn document(&self) -> &LibrariesDocument {
        &self.document
    }

    /// Registered libraries in registration order.
    pub fn list(&self) -> &[LibraryFile] {
        &self.document.libraries
    }

    pub fn len(&self) -> usize {
        self.document.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.libraries.is_empty()
    }

    pub fn find(&self, stored_path: &str) -> Option<&LibraryFile> {
        self.document
            .libraries
            .iter()
            .find(|l| l.stored_path == stored_path)
    }

    /// Get-or-fail lookup.
    pub fn get(&self, stored_path: &str) -> Result<&LibraryFile> {
        self.find(stored_path)
            .ok_or_else(|| InjectorError::LibraryNotFound {
                stored_path: stored_path.to_string(),
            })
    }

    /// Resolve a per-app selection; `None` when it is dangling or stale.
    pub fn resolve(&self, reference: &LibraryRef) -> Option<&LibraryFile> {
        self.find(&reference.stored_path)
            .filter(|l| l.generation == reference.generation)
    }

    /// Where a source file would be stored.
    pub fn stored_path_for(&self, short_id: &str, source: &Path) -> PathBuf {
        stored_path_in(&self.libraries_dir, short_id, source)
    }

    /// Raise the generation counter above `highest`. Never lowers it.
    pub(crate) fn reserve_generations_through(&mut self, highest: u64) {
        if self.document.next_generation <= highest {
            debug!(
                "Advancing library generation counter from {} to {}",
                self.document.next_generation,
                highest + 1
            );
            self.document.next_generation = highest + 1;
        }
    }

    /// Hash and copy `source` into `libraries_dir`.
    ///
    /// Touches no registry state, so it runs without the store lock.
    pub(crate) fn prepare_import(
        libraries_dir: &Path,
        name: Option<&str>,
        source: &Path,
    ) -> Result<PreparedImport> {
        let import_error = |message: String| InjectorError::ImportFailed {
            source_path: source.to_path_buf(),
            message,
        };

        let metadata = fs::metadata(source).map_err(|e| import_error(e.to_string()))?;
        if !metadata.is_file() {
            return Err(import_error("not a regular file".to_string()));
        }

        let hash = compute_content_hash(source).map_err(|e| import_error(e.to_string()))?;
        let short_id = hash.short_id(LimitsConfig::STORED_HASH_PREFIX_LEN);
        let stored = stored_path_in(libraries_dir, short_id, source);
        let stored_path = stored.to_string_lossy().to_string();

        // Same hash prefix and name means same content
        let created_file = if stored.is_file() {
            debug!("Managed copy already present: {}", stored_path);
            None
        } else {
            copy_into_place(source, &stored).map_err(|e| import_error(e.to_string()))?;
            Some(stored)
        };

        let display_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .or_else(|| source.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| stored_path.clone());

        Ok(PreparedImport {
            candidate: LibraryFile {
                name: display_name,
                original_path: source.to_string_lossy().to_string(),
                stored_path,
                sha256: hash.sha256,
                size_bytes: hash.size_bytes,
                imported_at: Utc::now().to_rfc3339(),
                generation: 0,
            },
            created_file,
        })
    }

    /// Register a prepared import in a copy of the document.
    ///
    /// The registry itself is unchanged; the caller persists
    /// `next_document` and then calls [`LibraryRegistry::commit`].
    pub(crate) fn stage_import(&self, prepared: PreparedImport) -> Result<StagedImport> {
        let PreparedImport {
            mut candidate,
            created_file,
        } = prepared;

        if let Some(existing) = self.find(&candidate.stored_path) {
            debug!("Library already registered: {}", candidate.stored_path);
            return Ok(StagedImport {
                entry: existing.clone(),
                next_document: None,
                created_file: None,
            });
        }

        // A concurrent import may have rolled back the shared managed copy
        if !Path::new(&candidate.stored_path).is_file() {
            return Err(InjectorError::ImportFailed {
                source_path: PathBuf::from(&candidate.original_path),
                message: format!("managed copy {} disappeared", candidate.stored_path),
            });
        }

        let mut next = self.document.clone();
        candidate.generation = next.next_generation;
        next.next_generation += 1;
        next.libraries.push(candidate.clone());

        Ok(StagedImport {
            entry: candidate,
            next_document: Some(next),
            created_file,
        })
    }

    /// Document without `stored_path`, or `None` if it isn't registered.
    pub(crate) fn stage_removal(&self, stored_path: &str) -> Option<LibrariesDocument> {
        self.find(stored_path)?;
        let mut next = self.document.clone();
        next.libraries.retain(|l| l.stored_path != stored_path);
        Some(next)
    }

    /// Replace the in-memory document after it has been persisted.
    pub(crate) fn commit(&mut self, document: LibrariesDocument) {
        self.document = document;
    }
}

fn stored_path_in(libraries_dir: &Path, short_id: &str, source: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    libraries_dir.join(format!("{}_{}", short_id, normalize_library_name(&file_name)))
}

/// Delete the managed copy of a removed library.
///
/// Missing files are logged, not treated as failures.
pub(crate) fn remove_backing_file(stored_path: &str) {
    match fs::remove_file(stored_path) {
        Ok(()) => debug!("Removed managed copy {}", stored_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Managed copy already missing: {}", stored_path);
        }
        Err(e) => warn!("Failed to remove managed copy {}: {}", stored_path, e),
    }
}

/// Copy via a temp file so the loader never sees a half-copied library.
fn copy_into_place(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path_for(dest);

    let result = fs::copy(source, &temp).and_then(|_| fs::rename(&temp, dest));
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_registry() -> (LibraryRegistry, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let libraries_dir = temp_dir.path().join("libraries");
        fs::create_dir_all(&libraries_dir).unwrap();
        let registry = LibraryRegistry::new(libraries_dir, LibrariesDocument::default());
        (registry, temp_dir)
    }

    fn create_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn import(registry: &mut LibraryRegistry, name: Option<&str>, source: &Path) -> LibraryFile {
        let prepared =
            LibraryRegistry::prepare_import(registry.libraries_dir(), name, source).unwrap();
        let staged = registry.stage_import(prepared).unwrap();
        if let Some(doc) = staged.next_document {
            registry.commit(doc);
        }
        staged.entry
    }

    #[test]
    fn test_import_copies_into_managed_dir() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"\x7fELF hook");

        let entry = import(&mut registry, Some("Hook"), &source);

        assert_eq!(entry.name, "Hook");
        assert_eq!(entry.original_path, source.to_string_lossy());
        assert!(Path::new(&entry.stored_path).starts_with(registry.libraries_dir()));
        assert!(entry.stored_path.ends_with("_libhook.so"));
        assert_eq!(fs::read(&entry.stored_path).unwrap(), b"\x7fELF hook");
        assert_eq!(entry.size_bytes, 9);
        assert_eq!(entry.generation, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_name_defaults_to_file_name() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libtrace.so", b"trace");

        let entry = import(&mut registry, None, &source);
        assert_eq!(entry.name, "libtrace.so");
    }

    #[test]
    fn test_reimport_identical_content_is_idempotent() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"same");

        let first = import(&mut registry, None, &source);
        let prepared =
            LibraryRegistry::prepare_import(registry.libraries_dir(), None, &source).unwrap();
        assert!(prepared.created_file.is_none());
        let staged = registry.stage_import(prepared).unwrap();

        assert!(staged.next_document.is_none());
        assert_eq!(staged.entry, first);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_content_same_name_gets_distinct_paths() {
        let (mut registry, temp_dir) = create_test_registry();
        let a_dir = temp_dir.path().join("a");
        let b_dir = temp_dir.path().join("b");
        fs::create_dir_all(&a_dir).unwrap();
        fs::create_dir_all(&b_dir).unwrap();
        let a = create_source(&a_dir, "libhook.so", b"version one");
        let b = create_source(&b_dir, "libhook.so", b"version two");

        let first = import(&mut registry, None, &a);
        let second = import(&mut registry, None, &b);

        assert_ne!(first.stored_path, second.stored_path);
        assert_eq!(registry.len(), 2);
        assert_eq!(second.generation, first.generation + 1);
    }

    #[test]
    fn test_import_unreadable_source_fails() {
        let (registry, temp_dir) = create_test_registry();

        let missing = temp_dir.path().join("missing.so");
        let err =
            LibraryRegistry::prepare_import(registry.libraries_dir(), None, &missing).unwrap_err();
        assert!(matches!(err, InjectorError::ImportFailed { .. }));

        let err = LibraryRegistry::prepare_import(registry.libraries_dir(), None, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, InjectorError::ImportFailed { .. }));
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let (mut registry, temp_dir) = create_test_registry();
        for name in ["libc1.so", "liba2.so", "libb3.so"] {
            let source = create_source(temp_dir.path(), name, name.as_bytes());
            import(&mut registry, None, &source);
        }

        let names: Vec<_> = registry.list().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["libc1.so", "liba2.so", "libb3.so"]);
    }

    #[test]
    fn test_get_not_found() {
        let (registry, _temp) = create_test_registry();
        let err = registry.get("/nope.so").unwrap_err();
        assert!(matches!(err, InjectorError::LibraryNotFound { .. }));
    }

    #[test]
    fn test_stage_removal() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"hook");
        let entry = import(&mut registry, None, &source);

        assert!(registry.stage_removal("/unknown.so").is_none());

        let next = registry.stage_removal(&entry.stored_path).unwrap();
        assert!(next.libraries.is_empty());
        // Counter never goes backwards
        assert_eq!(next.next_generation, 2);
        // Staging does not touch the live registry
        assert!(registry.find(&entry.stored_path).is_some());
    }

    #[test]
    fn test_resolve_checks_generation() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"hook");
        let entry = import(&mut registry, None, &source);

        let current = LibraryRef {
            stored_path: entry.stored_path.clone(),
            generation: entry.generation,
        };
        let stale = LibraryRef {
            stored_path: entry.stored_path.clone(),
            generation: entry.generation + 10,
        };
        assert!(registry.resolve(&current).is_some());
        assert!(registry.resolve(&stale).is_none());
    }

    #[test]
    fn test_racing_imports_share_one_entry() {
        let (mut registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"hook");
        let dir = registry.libraries_dir().to_path_buf();

        let first = LibraryRegistry::prepare_import(&dir, None, &source).unwrap();
        let second = LibraryRegistry::prepare_import(&dir, None, &source).unwrap();

        let staged = registry.stage_import(first).unwrap();
        registry.commit(staged.next_document.unwrap());

        let staged = registry.stage_import(second).unwrap();
        assert!(staged.next_document.is_none());
        assert!(staged.created_file.is_none());
        assert_eq!(staged.entry, registry.list()[0]);
        assert!(Path::new(&staged.entry.stored_path).is_file());
    }

    #[test]
    fn test_stage_fails_when_managed_copy_vanished() {
        let (registry, temp_dir) = create_test_registry();
        let source = create_source(temp_dir.path(), "libhook.so", b"hook");

        let prepared =
            LibraryRegistry::prepare_import(registry.libraries_dir(), None, &source).unwrap();
        fs::remove_file(&prepared.candidate.stored_path).unwrap();

        let err = registry.stage_import(prepared).unwrap_err();
        assert!(matches!(err, InjectorError::ImportFailed { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reserved_generations_are_skipped() {
        let (mut registry, temp_dir) = create_test_registry();
        registry.reserve_generations_through(4);
        // Never lowers the counter
        registry.reserve_generations_through(2);

        let source = create_source(temp_dir.path(), "libhook.so", b"hook");
        let entry = import(&mut registry, None, &source);
        assert_eq!(entry.generation, 5);
    }

    #[test]
    fn test_remove_backing_file_tolerates_missing() {
        let (_registry, temp_dir) = create_test_registry();
        let path = temp_dir.path().join("gone.so");
        remove_backing_file(&path.to_string_lossy());

        let present = create_source(temp_dir.path(), "here.so", b"x");
        remove_backing_file(&present.to_string_lossy());
        assert!(!present.exists());
    }
}
