//! Device-wide settings and persisted document roots.

use crate::config::LimitsConfig;
use crate::models::{AgentConfig, AppConfig, LibraryFile};
use crate::storage::current_schema_version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root structure for settings.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    /// Delay before injection, clamped to 0..=60000 on load.
    #[serde(default)]
    pub injection_delay_ms: u64,
    #[serde(default)]
    pub default_global_agent: AgentConfig,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            schema_version: current_schema_version(),
            injection_delay_ms: 0,
            default_global_agent: AgentConfig::factory_default(),
        }
    }
}

impl GlobalSettings {
    /// Bring loaded values back into their domain.
    pub(crate) fn clamped(mut self) -> Self {
        self.injection_delay_ms = self
            .injection_delay_ms
            .min(LimitsConfig::MAX_INJECTION_DELAY_MS);
        self
    }
}

/// Root structure for preferences.json (presentation preferences).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub hide_system_apps: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            schema_version: current_schema_version(),
            hide_system_apps: false,
        }
    }
}

/// Root structure for libraries.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrariesDocument {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    /// Generation handed to the next registration.
    #[serde(default = "first_generation")]
    pub next_generation: u64,
    /// Registration order.
    #[serde(default)]
    pub libraries: Vec<LibraryFile>,
}

fn first_generation() -> u64 {
    1
}

impl Default for LibrariesDocument {
    fn default() -> Self {
        Self {
            schema_version: current_schema_version(),
            next_generation: first_generation(),
            libraries: Vec::new(),
        }
    }
}

impl LibrariesDocument {
    /// Keep the counter ahead of every generation already handed out, so a
    /// hand-edited or older document can never produce a reused generation.
    pub(crate) fn normalized(mut self) -> Self {
        let highest = self
            .libraries
            .iter()
            .map(|l| l.generation)
            .max()
            .unwrap_or(0);
        self.next_generation = self.next_generation.max(highest + 1);
        self
    }
}

/// Root structure for apps.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppsDocument {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub apps: BTreeMap<String, AppConfig>,
}

impl Default for AppsDocument {
    fn default() -> Self {
        Self {
            schema_version: current_schema_version(),
            apps: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = GlobalSettings::default();
        assert_eq!(settings.injection_delay_ms, 0);
        assert_eq!(settings.default_global_agent, AgentConfig::factory_default());
        assert_eq!(settings.schema_version, 1);
    }

    #[test]
    fn test_loaded_delay_is_clamped() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{"injectionDelayMs": 999999}"#).unwrap();
        assert_eq!(settings.clamped().injection_delay_ms, 60_000);
    }

    #[test]
    fn test_libraries_document_normalizes_counter() {
        let doc: LibrariesDocument = serde_json::from_str(
            r#"{"nextGeneration": 2, "libraries": [
                {"name": "a", "originalPath": "/a", "storedPath": "/s/a", "generation": 7}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.normalized().next_generation, 8);
    }

    #[test]
    fn test_empty_documents_parse() {
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert!(!prefs.hide_system_apps);
        let apps: AppsDocument = serde_json::from_str("{}").unwrap();
        assert!(apps.apps.is_empty());
        let libs: LibrariesDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(libs.next_generation, 1);
    }
}
