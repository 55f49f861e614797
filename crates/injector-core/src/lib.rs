//! Injector Core - Headless configuration store for per-application injection.
//!
//! This crate owns the configuration a native loader reads when a target
//! application launches: which packages are enabled, which shared libraries
//! they load, and which instrumentation agent (if any) is started. It does no
//! injection itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use injector_core::{AgentSelection, ConfigStore, InjectionMethod};
//!
//! fn main() -> injector_core::Result<()> {
//!     let store = ConfigStore::open("/data/local/injector")?;
//!
//!     let lib = store.add_library(Some("Hook"), "/sdcard/Download/libhook.so")?;
//!     store.set_enabled("com.example.target", true)?;
//!     store.set_injection_method("com.example.target", InjectionMethod::Riru)?;
//!     store.add_selected_library("com.example.target", &lib.stored_path)?;
//!     store.set_agent_choice("com.example.target", AgentSelection::Global)?;
//!
//!     if let Some(plan) = store.injection_plan("com.example.target")? {
//!         println!("{} libraries, delay {} ms", plan.libraries.len(), plan.delay_ms);
//!     }
//!     Ok(())
//! }
//! ```

pub mod apps;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod plan;
pub mod registry;
pub mod settings;
pub mod storage;

mod store;

// Re-export commonly used types
pub use error::{InjectorError, Result};
pub use inventory::{
    build_app_list, icon_or_placeholder, AppEntry, AppIcon, AppInventory, AppListQuery,
    InstalledApp, StaticInventory,
};
pub use models::{
    AgentChoice, AgentConfig, AgentMode, AgentSelection, AppConfig, GlobalSettings,
    InjectionMethod, LibraryFile, LoadBehavior, PortConflictPolicy,
};
pub use plan::InjectionPlan;
pub use storage::{DocumentKey, DocumentStore, FsDocumentStore};
pub use store::ConfigStore;
