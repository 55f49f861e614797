//! The configuration store facade.
//!
//! [`ConfigStore`] is what every other subsystem talks to. It loads all
//! documents once at open, keeps them in a single mutex-guarded cache and
//! writes every mutation through to disk before returning. A mutation is
//! applied to a copy of the affected section; the copy replaces the cached
//! section only after it was persisted, so a failed write leaves both cache
//! and disk unchanged.

use crate::apps::AppConfigs;
use crate::inventory::AppInventory;
use crate::models::{
    AgentChoice, AgentConfig, AgentSelection, AppConfig, GlobalSettings, InjectionMethod,
    LibraryFile, Preferences,
};
use crate::plan::InjectionPlan;
use crate::registry::{remove_backing_file, LibraryRegistry};
use crate::settings::GlobalConfig;
use crate::storage::{load_json, save_json, DocumentKey, DocumentStore, FsDocumentStore, Loaded};
use crate::{InjectorError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Authoritative in-memory copy of every persisted section.
struct StoreState {
    global: GlobalConfig,
    registry: LibraryRegistry,
    apps: AppConfigs,
}

/// Lock-guarded, write-through configuration store.
pub struct ConfigStore {
    backend: Box<dyn DocumentStore>,
    libraries_dir: PathBuf,
    state: Mutex<StoreState>,
}

impl ConfigStore {
    /// Open (or initialize) the store rooted at `root`.
    ///
    /// Malformed documents are replaced by defaults for their section only;
    /// only filesystem failures make this return an error.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let backend = FsDocumentStore::new(root.as_ref());
        let libraries_dir = backend.libraries_dir();
        let store = Self::with_backend(Box::new(backend), libraries_dir)?;
        info!("Opened configuration store at {}", root.as_ref().display());
        Ok(store)
    }

    /// Open on top of an arbitrary backend; `libraries_dir` receives imports.
    pub fn with_backend(
        backend: Box<dyn DocumentStore>,
        libraries_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        backend.ensure_layout()?;
        let libraries_dir = libraries_dir.into();

        let settings: GlobalSettings = load_section(backend.as_ref(), DocumentKey::Settings)?;
        let preferences: Preferences = load_section(backend.as_ref(), DocumentKey::Preferences)?;
        let libraries = load_section(backend.as_ref(), DocumentKey::Libraries)?;
        let apps = load_section(backend.as_ref(), DocumentKey::Apps)?;

        let apps = AppConfigs::new(apps);
        let mut registry = LibraryRegistry::new(libraries_dir.clone(), libraries);
        // Selections may reference generations a lost registry no longer knows
        registry.reserve_generations_through(apps.highest_selected_generation());

        let state = StoreState {
            global: GlobalConfig::new(settings, preferences),
            registry,
            apps,
        };
        debug!(
            "Loaded {} libraries and {} app entries",
            state.registry.len(),
            state.apps.document().apps.len()
        );

        Ok(Self {
            backend,
            libraries_dir,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| InjectorError::LockPoisoned)
    }

    /// Apply `f` to a copy of the app section, persist, then publish.
    fn update_apps<R>(
        &self,
        f: impl FnOnce(&mut AppConfigs, &LibraryRegistry) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.lock()?;
        let mut next = state.apps.clone();
        let out = f(&mut next, &state.registry)?;
        if next.document() != state.apps.document() {
            save_json(self.backend.as_ref(), DocumentKey::Apps, next.document())?;
            state.apps = next;
        }
        Ok(out)
    }

    /// Apply `f` to a copy of the global section and persist `key`.
    fn update_global<R>(
        &self,
        key: DocumentKey,
        f: impl FnOnce(&mut GlobalConfig) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.lock()?;
        let mut next = state.global.clone();
        let out = f(&mut next)?;
        match key {
            DocumentKey::Preferences => {
                save_json(self.backend.as_ref(), key, next.preferences())?
            }
            _ => save_json(self.backend.as_ref(), key, next.settings())?,
        }
        state.global = next;
        Ok(out)
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> Result<R> {
        let state = self.lock()?;
        Ok(f(&state))
    }

    // ========================================
    // Library registry
    // ========================================

    pub fn libraries_dir(&self) -> Result<PathBuf> {
        Ok(self.libraries_dir.clone())
    }

    /// Import `source` into managed storage and register it.
    ///
    /// Importing the same content under the same file name again returns the
    /// existing entry. Hashing and copying happen before the cache lock is
    /// taken; only registration and the document write run under it.
    pub fn add_library(
        &self,
        name: Option<&str>,
        source: impl AsRef<Path>,
    ) -> Result<LibraryFile> {
        let source = source.as_ref();
        let prepared = LibraryRegistry::prepare_import(&self.libraries_dir, name, source)?;

        let mut state = self.lock()?;
        let staged = state.registry.stage_import(prepared)?;

        let Some(next) = staged.next_document else {
            return Ok(staged.entry);
        };

        if let Err(e) = save_json(self.backend.as_ref(), DocumentKey::Libraries, &next) {
            if let Some(created) = &staged.created_file {
                let _ = fs::remove_file(created);
            }
            return Err(e);
        }
        state.registry.commit(next);

        info!(
            "Imported library {} from {} as {}",
            staged.entry.name,
            source.display(),
            staged.entry.stored_path
        );
        Ok(staged.entry)
    }

    /// Unregister a library and delete its managed copy.
    ///
    /// Per-app selections are left alone and stop resolving. Returns false
    /// when `stored_path` was not registered.
    pub fn remove_library(&self, stored_path: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(next) = state.registry.stage_removal(stored_path) else {
            debug!("Library not registered, nothing to remove: {}", stored_path);
            return Ok(false);
        };

        save_json(self.backend.as_ref(), DocumentKey::Libraries, &next)?;
        state.registry.commit(next);
        remove_backing_file(stored_path);

        info!("Removed library {}", stored_path);
        Ok(true)
    }

    /// Registered libraries in registration order.
    pub fn list_libraries(&self) -> Result<Vec<LibraryFile>> {
        self.read(|s| s.registry.list().to_vec())
    }

    pub fn find_library(&self, stored_path: &str) -> Result<Option<LibraryFile>> {
        self.read(|s| s.registry.find(stored_path).cloned())
    }

    /// Get-or-fail registry lookup.
    pub fn get_library(&self, stored_path: &str) -> Result<LibraryFile> {
        let state = self.lock()?;
        state.registry.get(stored_path).cloned()
    }

    // ========================================
    // Per-application config
    // ========================================

    pub fn app_config(&self, package: &str) -> Result<AppConfig> {
        self.read(|s| s.apps.config(package))
    }

    pub fn configured_packages(&self) -> Result<Vec<String>> {
        self.read(|s| s.apps.configured_packages())
    }

    pub fn is_enabled(&self, package: &str) -> Result<bool> {
        self.read(|s| s.apps.is_enabled(package))
    }

    pub fn set_enabled(&self, package: &str, enabled: bool) -> Result<()> {
        self.update_apps(|apps, _| apps.set_enabled(package, enabled))
    }

    pub fn injection_method(&self, package: &str) -> Result<InjectionMethod> {
        self.read(|s| s.apps.injection_method(package))
    }

    pub fn set_injection_method(&self, package: &str, method: InjectionMethod) -> Result<()> {
        self.update_apps(|apps, _| apps.set_injection_method(package, method))
    }

    /// Selected libraries that are currently registered, in injection order.
    pub fn selected_libraries(&self, package: &str) -> Result<Vec<LibraryFile>> {
        self.read(|s| s.apps.selected_libraries(package, &s.registry))
    }

    /// Select a registered library for `package`; a no-op if already selected.
    pub fn add_selected_library(&self, package: &str, stored_path: &str) -> Result<()> {
        self.update_apps(|apps, registry| {
            let library = registry.get(stored_path)?;
            apps.add_library(package, library).map(|_| ())
        })
    }

    pub fn remove_selected_library(&self, package: &str, stored_path: &str) -> Result<()> {
        self.update_apps(|apps, _| apps.remove_library(package, stored_path).map(|_| ()))
    }

    /// Replace the whole selection of `package` in one write.
    pub fn set_selected_libraries<S: AsRef<str>>(
        &self,
        package: &str,
        stored_paths: &[S],
    ) -> Result<()> {
        self.update_apps(|apps, registry| {
            let libraries = stored_paths
                .iter()
                .map(|p| registry.get(p.as_ref()).cloned())
                .collect::<Result<Vec<_>>>()?;
            apps.set_selected_libraries(package, &libraries)
        })
    }

    pub fn use_global_agent(&self, package: &str) -> Result<bool> {
        self.read(|s| s.apps.use_global_agent(package))
    }

    pub fn set_use_global_agent(&self, package: &str, use_global: bool) -> Result<()> {
        self.update_apps(|apps, _| apps.set_use_global_agent(package, use_global))
    }

    /// The override, or `None` while the package uses the global agent.
    pub fn agent_override(&self, package: &str) -> Result<Option<AgentConfig>> {
        self.read(|s| s.apps.agent_override(package))
    }

    pub fn set_agent_override(&self, package: &str, agent: Option<AgentConfig>) -> Result<()> {
        self.update_apps(|apps, _| apps.set_agent_override(package, agent))
    }

    pub fn agent_choice(&self, package: &str) -> Result<AgentChoice> {
        self.read(|s| s.apps.agent_choice(package))
    }

    pub fn set_agent_choice(&self, package: &str, selection: AgentSelection) -> Result<()> {
        self.update_apps(|apps, _| apps.set_agent_choice(package, selection))
    }

    /// Agent that would be started for `package`, if any.
    pub fn effective_agent(&self, package: &str) -> Result<Option<AgentConfig>> {
        self.read(|s| {
            s.apps
                .effective_agent(package, s.global.default_global_agent())
        })
    }

    /// Drop entries of packages no longer installed.
    ///
    /// Never runs on its own; callers decide when the inventory is complete
    /// enough to prune against.
    pub fn prune_orphans(&self, inventory: &dyn AppInventory) -> Result<Vec<String>> {
        let installed: HashSet<String> = inventory
            .installed_apps()
            .map(|app| app.package_name)
            .collect();

        let removed =
            self.update_apps(|apps, _| Ok(apps.retain_packages(|pkg| installed.contains(pkg))))?;
        for pkg in &removed {
            warn!("Pruned configuration of uninstalled package {}", pkg);
        }
        Ok(removed)
    }

    // ========================================
    // Global settings
    // ========================================

    pub fn global_settings(&self) -> Result<GlobalSettings> {
        self.read(|s| s.global.settings().clone())
    }

    pub fn hide_system_apps(&self) -> Result<bool> {
        self.read(|s| s.global.hide_system_apps())
    }

    pub fn set_hide_system_apps(&self, hide: bool) -> Result<()> {
        self.update_global(DocumentKey::Preferences, |g| {
            g.set_hide_system_apps(hide);
            Ok(())
        })
    }

    pub fn injection_delay_seconds(&self) -> Result<i64> {
        self.read(|s| s.global.injection_delay_seconds())
    }

    pub fn injection_delay_ms(&self) -> Result<u64> {
        self.read(|s| s.global.injection_delay_ms())
    }

    /// Rejects values outside 0..=60 with a validation error.
    pub fn set_injection_delay_seconds(&self, seconds: i64) -> Result<()> {
        self.update_global(DocumentKey::Settings, |g| {
            g.set_injection_delay_seconds(seconds)
        })
    }

    pub fn default_global_agent(&self) -> Result<AgentConfig> {
        self.read(|s| s.global.default_global_agent().clone())
    }

    pub fn set_default_global_agent(&self, agent: AgentConfig) -> Result<()> {
        self.update_global(DocumentKey::Settings, |g| g.set_default_global_agent(agent))
    }

    pub fn reset_default_global_agent_to_factory_default(&self) -> Result<()> {
        self.update_global(DocumentKey::Settings, |g| {
            g.reset_default_global_agent();
            Ok(())
        })
    }

    // ========================================
    // Injection plans
    // ========================================

    /// Resolved configuration for `package`, `None` when it is disabled.
    pub fn injection_plan(&self, package: &str) -> Result<Option<InjectionPlan>> {
        self.read(|s| InjectionPlan::resolve(package, &s.apps, &s.registry, &s.global))
    }

    /// Plans for every enabled package, sorted by package name.
    pub fn injection_plans(&self) -> Result<Vec<InjectionPlan>> {
        self.read(|s| {
            s.apps
                .configured_packages()
                .iter()
                .filter_map(|pkg| InjectionPlan::resolve(pkg, &s.apps, &s.registry, &s.global))
                .collect()
        })
    }
}

/// Load one section, recovering corrupt documents to defaults.
fn load_section<T: DeserializeOwned + Default>(
    backend: &dyn DocumentStore,
    key: DocumentKey,
) -> Result<T> {
    match load_json(backend, key)? {
        Loaded::Parsed(value) => Ok(value),
        Loaded::Missing => {
            debug!("{} not found, using defaults", key);
            Ok(T::default())
        }
        Loaded::Corrupt(reason) => {
            error!("{} is corrupt, falling back to defaults: {}", key, reason);
            Ok(T::default())
        }
    }
}
