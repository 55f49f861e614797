//! Atomic file operations for document persistence.
//!
//! Writes follow the same sequence every time:
//! 1. Write to a sibling temp file with a unique PID+TID suffix
//! 2. fsync so the bytes reach disk
//! 3. Optionally copy the previous version to `<name>.bak`
//! 4. Rename the temp file over the target
//!
//! A concurrent reader therefore sees either the old or the new document,
//! never a partial one.

use crate::{InjectorError, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read a whole file.
///
/// Returns `None` if the file doesn't exist.
pub fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(InjectorError::Storage {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }),
    }
}

/// Replace `path` with `bytes` atomically.
pub fn atomic_write(path: &Path, bytes: &[u8], keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| InjectorError::Storage {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let temp_path = temp_path_for(path);

    if let Err(e) = write_synced(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if keep_backup && path.exists() {
        let backup_path = backup_path_for(path);
        if let Err(e) = fs::copy(path, &backup_path) {
            // Backup failure is not fatal
            warn!("Failed to create backup {}: {}", backup_path.display(), e);
        } else {
            debug!("Created backup: {}", backup_path.display());
        }
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(InjectorError::Storage {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Path of the backup copy kept next to `path`.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Sibling temp path, unique per process and thread.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{}.tmp", process::id(), thread_id()));
    path.with_file_name(name)
}

fn write_synced(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| InjectorError::Storage {
            message: format!("Failed to create temp file {}", temp_path.display()),
            path: Some(temp_path.to_path_buf()),
            source: Some(e),
        })?;

    file.write_all(bytes).map_err(|e| InjectorError::Storage {
        message: format!("Failed to write temp file {}", temp_path.display()),
        path: Some(temp_path.to_path_buf()),
        source: Some(e),
    })?;

    file.sync_all().map_err(|e| InjectorError::Storage {
        message: format!("Failed to sync temp file {}", temp_path.display()),
        path: Some(temp_path.to_path_buf()),
        source: Some(e),
    })
}

/// Numeric identifier for the current thread, used to keep temp names unique.
fn thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}
