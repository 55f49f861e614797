//! Installed-application inventory boundary and the app-list view.
//!
//! Enumerating packages and loading icons belongs to the host platform. This
//! module only defines the interface the store consumes and the filtered,
//! sorted list the presentation layer renders.

use crate::store::ConfigStore;
use crate::{InjectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One installed application as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub display_name: String,
    pub package_name: String,
    #[serde(default)]
    pub is_system: bool,
    /// Last install/update time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_update_ms: i64,
}

/// Icon bytes, or the placeholder shown while loading fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppIcon {
    Loaded(Vec<u8>),
    Placeholder,
}

/// Source of installed applications.
pub trait AppInventory: Send + Sync {
    /// Lazily enumerate installed applications.
    fn installed_apps(&self) -> Box<dyn Iterator<Item = InstalledApp> + '_>;

    /// Load the icon of `package`. May fail for any reason.
    fn load_icon(&self, package: &str) -> Result<Vec<u8>>;
}

/// Icon of `package`, degrading to [`AppIcon::Placeholder`] on failure.
pub fn icon_or_placeholder(inventory: &dyn AppInventory, package: &str) -> AppIcon {
    match inventory.load_icon(package) {
        Ok(bytes) => AppIcon::Loaded(bytes),
        Err(e) => {
            debug!("Icon for {} unavailable: {}", package, e);
            AppIcon::Placeholder
        }
    }
}

/// Inventory backed by a fixed list, e.g. exported from a device.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    apps: Vec<InstalledApp>,
}

impl StaticInventory {
    pub fn new(apps: Vec<InstalledApp>) -> Self {
        Self { apps }
    }

    /// Load a JSON array of [`InstalledApp`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| InjectorError::io_with_path(e, path))?;
        let apps = serde_json::from_slice(&bytes)?;
        Ok(Self { apps })
    }
}

impl AppInventory for StaticInventory {
    fn installed_apps(&self) -> Box<dyn Iterator<Item = InstalledApp> + '_> {
        Box::new(self.apps.iter().cloned())
    }

    fn load_icon(&self, package: &str) -> Result<Vec<u8>> {
        Err(InjectorError::Storage {
            message: format!("no icon source for {}", package),
            path: None,
            source: None,
        })
    }
}

/// Filters for [`build_app_list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppListQuery {
    /// Case-insensitive substring of display or package name; empty matches all.
    pub search: String,
    pub hide_system_apps: bool,
}

impl AppListQuery {
    /// Query using the persisted system-app preference.
    pub fn from_preferences(store: &ConfigStore, search: impl Into<String>) -> Result<Self> {
        Ok(Self {
            search: search.into(),
            hide_system_apps: store.hide_system_apps()?,
        })
    }

    fn matches(&self, app: &InstalledApp) -> bool {
        if self.hide_system_apps && app.is_system {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        app.display_name.to_lowercase().contains(&needle)
            || app.package_name.to_lowercase().contains(&needle)
    }
}

/// A row of the app list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    #[serde(flatten)]
    pub app: InstalledApp,
    pub enabled: bool,
}

/// Installed apps matching `query`, enabled first, then most recently updated.
pub fn build_app_list(
    inventory: &dyn AppInventory,
    store: &ConfigStore,
    query: &AppListQuery,
) -> Result<Vec<AppEntry>> {
    let mut entries = inventory
        .installed_apps()
        .filter(|app| query.matches(app))
        .map(|app| -> Result<AppEntry> {
            let enabled = store.is_enabled(&app.package_name)?;
            Ok(AppEntry { app, enabled })
        })
        .collect::<Result<Vec<_>>>()?;

    entries.sort_by(|a, b| {
        b.enabled
            .cmp(&a.enabled)
            .then_with(|| b.app.last_update_ms.cmp(&a.app.last_update_ms))
    });
    Ok(entries)
}
