//! Library registry: managed copies of injectable shared libraries.

mod hashing;
mod library_registry;
mod naming;

pub use hashing::{compute_content_hash, ContentHash};
pub use library_registry::LibraryRegistry;
pub use naming::normalize_library_name;

pub(crate) use library_registry::remove_backing_file;
