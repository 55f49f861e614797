//! Per-application injection configuration.
//!
//! [`AppConfigs`] wraps the `apps.json` document. Reads of packages that were
//! never configured return [`AppConfig::default`]; entries are created on the
//! first write. Mutators change only the in-memory document, the store
//! persists it before publishing the change.

use crate::models::{
    validate_package_name, AgentChoice, AgentConfig, AgentSelection, AppConfig, AppsDocument,
    InjectionMethod, LibraryFile, LibraryRef,
};
use crate::registry::LibraryRegistry;
use crate::Result;
use tracing::{debug, error};

#[derive(Debug, Clone, Default)]
pub struct AppConfigs {
    document: AppsDocument,
}

impl AppConfigs {
    /// Wrap a loaded document, dropping agent overrides that fail validation.
    ///
    /// A package whose override was dropped and that does not use the global
    /// agent ends up with no agent.
    pub fn new(mut document: AppsDocument) -> Self {
        for (package, config) in document.apps.iter_mut() {
            let Some(agent) = &config.agent_override else {
                continue;
            };
            if let Err(e) = agent.validate() {
                error!("Dropping invalid agent override of {}: {}", package, e);
                config.agent_override = None;
            }
        }
        Self { document }
    }

    pub fn document(&self) -> &AppsDocument {
        &self.document
    }

    /// Stored entry for `package`, if one exists.
    pub fn get(&self, package: &str) -> Option<&AppConfig> {
        self.document.apps.get(package)
    }

    /// Full record for `package`, defaulted when never configured.
    pub fn config(&self, package: &str) -> AppConfig {
        self.get(package).cloned().unwrap_or_default()
    }

    /// Packages with a stored entry, sorted.
    pub fn configured_packages(&self) -> Vec<String> {
        self.document.apps.keys().cloned().collect()
    }

    /// Highest library generation referenced by any selection, 0 if none.
    pub fn highest_selected_generation(&self) -> u64 {
        self.document
            .apps
            .values()
            .flat_map(|c| c.selected_libraries.iter())
            .map(|r| r.generation)
            .max()
            .unwrap_or(0)
    }

    pub fn is_enabled(&self, package: &str) -> bool {
        self.get(package).is_some_and(|c| c.enabled)
    }

    pub fn injection_method(&self, package: &str) -> InjectionMethod {
        self.get(package)
            .map(|c| c.injection_method)
            .unwrap_or_default()
    }

    pub fn use_global_agent(&self, package: &str) -> bool {
        self.get(package).map_or(true, |c| c.use_global_agent)
    }

    /// The override, only while the package does not use the global agent.
    pub fn agent_override(&self, package: &str) -> Option<AgentConfig> {
        self.get(package)
            .and_then(|c| c.active_override())
            .cloned()
    }

    pub fn agent_choice(&self, package: &str) -> AgentChoice {
        self.get(package)
            .map(AppConfig::agent_choice)
            .unwrap_or(AgentChoice::Global)
    }

    /// Agent actually used for `package`: none, the global default, or its override.
    pub fn effective_agent(&self, package: &str, global: &AgentConfig) -> Option<AgentConfig> {
        match self.agent_choice(package) {
            AgentChoice::None => None,
            AgentChoice::Global => Some(global.clone()),
            AgentChoice::Custom => self.agent_override(package),
        }
    }

    /// Selected libraries in injection order, skipping dangling or stale refs.
    ///
    /// The stored selection is never modified here.
    pub fn selected_libraries(
        &self,
        package: &str,
        registry: &LibraryRegistry,
    ) -> Vec<LibraryFile> {
        let Some(config) = self.get(package) else {
            return Vec::new();
        };
        config
            .selected_libraries
            .iter()
            .filter_map(|r| registry.resolve(r).cloned())
            .collect()
    }

    pub fn set_enabled(&mut self, package: &str, enabled: bool) -> Result<()> {
        self.entry(package)?.enabled = enabled;
        Ok(())
    }

    pub fn set_injection_method(&mut self, package: &str, method: InjectionMethod) -> Result<()> {
        self.entry(package)?.injection_method = method;
        Ok(())
    }

    /// Append `library` unless an up-to-date selection of it exists.
    ///
    /// A stale selection of the same stored path is replaced in place.
    /// Returns false when nothing changed.
    pub fn add_library(&mut self, package: &str, library: &LibraryFile) -> Result<bool> {
        let fresh = LibraryRef {
            stored_path: library.stored_path.clone(),
            generation: library.generation,
        };
        let config = self.entry(package)?;

        match config
            .selected_libraries
            .iter_mut()
            .find(|r| r.stored_path == fresh.stored_path)
        {
            Some(existing) if *existing == fresh => Ok(false),
            Some(existing) => {
                debug!("Replacing stale selection of {} for {}", fresh.stored_path, package);
                *existing = fresh;
                Ok(true)
            }
            None => {
                config.selected_libraries.push(fresh);
                Ok(true)
            }
        }
    }

    /// Drop `stored_path` from the selection. Returns false when it wasn't selected.
    pub fn remove_library(&mut self, package: &str, stored_path: &str) -> Result<bool> {
        validate_package_name(package)?;
        let Some(config) = self.document.apps.get_mut(package) else {
            return Ok(false);
        };
        let before = config.selected_libraries.len();
        config
            .selected_libraries
            .retain(|r| r.stored_path != stored_path);
        Ok(config.selected_libraries.len() != before)
    }

    /// Replace the whole selection; the first occurrence of a duplicate wins.
    pub fn set_selected_libraries(
        &mut self,
        package: &str,
        libraries: &[LibraryFile],
    ) -> Result<()> {
        let config = self.entry(package)?;
        config.selected_libraries.clear();
        for library in libraries {
            if !config.is_selected(&library.stored_path) {
                config.selected_libraries.push(LibraryRef {
                    stored_path: library.stored_path.clone(),
                    generation: library.generation,
                });
            }
        }
        Ok(())
    }

    pub fn set_use_global_agent(&mut self, package: &str, use_global: bool) -> Result<()> {
        self.entry(package)?.use_global_agent = use_global;
        Ok(())
    }

    /// Store or clear the override. Does not touch `use_global_agent`.
    pub fn set_agent_override(&mut self, package: &str, agent: Option<AgentConfig>) -> Result<()> {
        if let Some(agent) = &agent {
            agent.validate()?;
        }
        self.entry(package)?.agent_override = agent;
        Ok(())
    }

    pub fn set_agent_choice(&mut self, package: &str, selection: AgentSelection) -> Result<()> {
        if let AgentSelection::Custom(agent) = &selection {
            agent.validate()?;
        }
        let config = self.entry(package)?;
        match selection {
            AgentSelection::None => {
                config.use_global_agent = false;
                config.agent_override = None;
            }
            AgentSelection::Global => config.use_global_agent = true,
            AgentSelection::Custom(agent) => {
                config.use_global_agent = false;
                config.agent_override = Some(agent);
            }
        }
        Ok(())
    }

    /// Remove entries whose package fails `keep`. Returns the removed names.
    pub fn retain_packages(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let removed: Vec<String> = self
            .document
            .apps
            .keys()
            .filter(|pkg| !keep(pkg.as_str()))
            .cloned()
            .collect();
        for pkg in &removed {
            self.document.apps.remove(pkg);
        }
        removed
    }

    fn entry(&mut self, package: &str) -> Result<&mut AppConfig> {
        validate_package_name(package)?;
        Ok(self.document.apps.entry(package.to_string()).or_default())
    }
}
