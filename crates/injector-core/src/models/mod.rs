//! Data model shared by the store components.
//!
//! All persisted types serialize with camelCase keys; enum values use the
//! spellings the native loader expects (`custom_linker`, `pick-other`, ...).

mod agent;
mod app;
mod library;
mod settings;

pub use agent::{AgentConfig, AgentMode, LoadBehavior, PortConflictPolicy};
pub use app::{
    validate_package_name, AgentChoice, AgentSelection, AppConfig, InjectionMethod, LibraryRef,
};
pub use library::LibraryFile;
pub use settings::{AppsDocument, GlobalSettings, LibrariesDocument, Preferences};
