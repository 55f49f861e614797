//! Per-application injection configuration.

use crate::models::AgentConfig;
use crate::{InjectorError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Mechanism the native loader uses to get libraries into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InjectionMethod {
    #[default]
    Standard,
    Riru,
    CustomLinker,
}

impl InjectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionMethod::Standard => "standard",
            InjectionMethod::Riru => "riru",
            InjectionMethod::CustomLinker => "custom_linker",
        }
    }
}

impl FromStr for InjectionMethod {
    type Err = InjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(InjectionMethod::Standard),
            "riru" => Ok(InjectionMethod::Riru),
            "custom_linker" | "custom-linker" => Ok(InjectionMethod::CustomLinker),
            other => Err(InjectorError::validation(
                "injectionMethod",
                format!(
                    "unknown method '{}' (expected standard, riru or custom_linker)",
                    other
                ),
            )),
        }
    }
}

impl std::fmt::Display for InjectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-app selection of a registered library.
///
/// `generation` pins the selection to one registration of `stored_path`; if
/// the library is removed and imported again it gets a new generation and the
/// old selection stays unresolved until the library is selected again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRef {
    pub stored_path: String,
    pub generation: u64,
}

/// The three-way agent selection of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentChoice {
    /// No agent is started.
    None,
    /// The global default agent is used.
    Global,
    /// The package's own override is used.
    Custom,
}

/// Input for changing a package's agent selection in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSelection {
    None,
    Global,
    Custom(AgentConfig),
}

/// Stored configuration for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub injection_method: InjectionMethod,
    /// Insertion order is injection order.
    #[serde(default)]
    pub selected_libraries: Vec<LibraryRef>,
    #[serde(default = "default_true")]
    pub use_global_agent: bool,
    /// Kept while `use_global_agent` is true so toggling back restores it.
    #[serde(default)]
    pub agent_override: Option<AgentConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            injection_method: InjectionMethod::Standard,
            selected_libraries: Vec::new(),
            use_global_agent: true,
            agent_override: None,
        }
    }
}

impl AppConfig {
    /// The override, if it is in effect.
    pub fn active_override(&self) -> Option<&AgentConfig> {
        if self.use_global_agent {
            None
        } else {
            self.agent_override.as_ref()
        }
    }

    pub fn agent_choice(&self) -> AgentChoice {
        match (self.use_global_agent, &self.agent_override) {
            (true, _) => AgentChoice::Global,
            (false, Some(_)) => AgentChoice::Custom,
            (false, None) => AgentChoice::None,
        }
    }

    pub fn is_selected(&self, stored_path: &str) -> bool {
        self.selected_libraries
            .iter()
            .any(|r| r.stored_path == stored_path)
    }
}

/// Reject package names the loader could never match.
pub fn validate_package_name(package: &str) -> Result<()> {
    if package.is_empty() {
        return Err(InjectorError::validation("package", "must not be empty"));
    }
    if package.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
        return Err(InjectorError::validation(
            "package",
            format!("'{}' contains whitespace or a path separator", package),
        ));
    }
    Ok(())
}
