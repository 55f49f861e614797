//! Fully resolved injection configuration of one package.

use crate::apps::AppConfigs;
use crate::models::{AgentConfig, InjectionMethod, LibraryFile};
use crate::registry::LibraryRegistry;
use crate::settings::GlobalConfig;
use serde::Serialize;

/// What the native loader needs to inject into one package.
///
/// Dangling selections are already dropped and the agent choice resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionPlan {
    pub package_name: String,
    pub method: InjectionMethod,
    /// Injection order.
    pub libraries: Vec<LibraryFile>,
    pub agent: Option<AgentConfig>,
    pub delay_ms: u64,
}

impl InjectionPlan {
    /// `None` unless `package` is enabled.
    pub(crate) fn resolve(
        package: &str,
        apps: &AppConfigs,
        registry: &LibraryRegistry,
        global: &GlobalConfig,
    ) -> Option<Self> {
        if !apps.is_enabled(package) {
            return None;
        }
        Some(Self {
            package_name: package.to_string(),
            method: apps.injection_method(package),
            libraries: apps.selected_libraries(package, registry),
            agent: apps.effective_agent(package, global.default_global_agent()),
            delay_ms: global.injection_delay_ms(),
        })
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }
}
