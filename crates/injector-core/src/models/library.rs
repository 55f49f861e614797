//! Registered shared-library files.

use serde::{Deserialize, Serialize};

/// A shared library copied into managed storage.
///
/// Identity is `stored_path`. Entries are immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFile {
    /// Display name.
    pub name: String,
    /// Where the file was imported from.
    pub original_path: String,
    /// Absolute path of the managed copy; the registry key.
    pub stored_path: String,
    /// SHA256 of the file content, lowercase hex.
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size_bytes: u64,
    /// RFC 3339 import timestamp.
    #[serde(default)]
    pub imported_at: String,
    /// Registration number, unique across the registry's lifetime.
    #[serde(default)]
    pub generation: u64,
}
