//! Persistence of the configuration documents.
//!
//! This module provides:
//! - Atomic file replacement (temp file, fsync, rename)
//! - The [`DocumentStore`] trait and its filesystem implementation
//! - JSON load/save helpers that report corrupt documents instead of failing

mod atomic;
mod backend;

pub use atomic::{atomic_write, backup_path_for, read_bytes};
pub use backend::{load_json, save_json, DocumentKey, DocumentStore, FsDocumentStore, Loaded};
pub(crate) use atomic::temp_path_for;
pub(crate) use backend::current_schema_version;
