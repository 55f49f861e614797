//! Instrumentation agent ("Gadget") configuration.

use crate::config::{AgentDefaults, LimitsConfig};
use crate::{InjectorError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

/// How the agent runs once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Execute a script from `script_path`.
    #[default]
    Script,
    /// Expose a control server on `address:port`.
    Server,
}

/// What the agent does when its port is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PortConflictPolicy {
    #[default]
    Fail,
    PickOther,
}

/// Whether the target waits for the agent before resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadBehavior {
    #[default]
    Wait,
    Resume,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Script => "script",
            AgentMode::Server => "server",
        }
    }
}

impl PortConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortConflictPolicy::Fail => "fail",
            PortConflictPolicy::PickOther => "pick-other",
        }
    }
}

impl LoadBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBehavior::Wait => "wait",
            LoadBehavior::Resume => "resume",
        }
    }
}

impl FromStr for AgentMode {
    type Err = InjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(AgentMode::Script),
            "server" => Ok(AgentMode::Server),
            other => Err(InjectorError::validation(
                "mode",
                format!("unknown agent mode '{}' (expected script or server)", other),
            )),
        }
    }
}

impl FromStr for PortConflictPolicy {
    type Err = InjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(PortConflictPolicy::Fail),
            "pick-other" | "pick_other" => Ok(PortConflictPolicy::PickOther),
            other => Err(InjectorError::validation(
                "onPortConflict",
                format!("unknown policy '{}' (expected fail or pick-other)", other),
            )),
        }
    }
}

impl FromStr for LoadBehavior {
    type Err = InjectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wait" => Ok(LoadBehavior::Wait),
            "resume" => Ok(LoadBehavior::Resume),
            other => Err(InjectorError::validation(
                "onLoad",
                format!("unknown load behavior '{}' (expected wait or resume)", other),
            )),
        }
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for PortConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for LoadBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent settings, assigned by value to the global or a per-app scope.
///
/// `address` and `port` only matter in server mode, `script_path` only in
/// script mode; all fields are persisted regardless so switching modes does
/// not lose input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub mode: AgentMode,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub on_port_conflict: PortConflictPolicy,
    #[serde(default)]
    pub on_load: LoadBehavior,
    #[serde(default = "default_script_path")]
    pub script_path: String,
    #[serde(default = "default_binary_name")]
    pub agent_binary_name: String,
}

fn default_address() -> String {
    AgentDefaults::ADDRESS.to_string()
}
fn default_port() -> u16 {
    AgentDefaults::PORT
}
fn default_script_path() -> String {
    AgentDefaults::SCRIPT_PATH.to_string()
}
fn default_binary_name() -> String {
    AgentDefaults::BINARY_NAME.to_string()
}

impl AgentConfig {
    /// The hard-coded baseline restored by a factory reset.
    pub fn factory_default() -> Self {
        Self {
            mode: AgentMode::Script,
            address: default_address(),
            port: default_port(),
            on_port_conflict: PortConflictPolicy::Fail,
            on_load: LoadBehavior::Wait,
            script_path: default_script_path(),
            agent_binary_name: default_binary_name(),
        }
    }

    /// Convert a caller-supplied port, rejecting anything outside [1, 65535].
    ///
    /// Ports are never clamped.
    pub fn parse_port(port: i64) -> Result<u16> {
        let min = LimitsConfig::MIN_PORT as i64;
        let max = LimitsConfig::MAX_PORT as i64;
        if (min..=max).contains(&port) {
            Ok(port as u16)
        } else {
            Err(InjectorError::validation(
                "port",
                format!("{} is outside {}..={}", port, min, max),
            ))
        }
    }

    /// Check the invariants a persisted agent config must satisfy.
    pub fn validate(&self) -> Result<()> {
        Self::parse_port(self.port as i64)?;

        if self.mode == AgentMode::Server && self.address.parse::<IpAddr>().is_err() {
            return Err(InjectorError::validation(
                "address",
                format!("'{}' is not an IP address", self.address),
            ));
        }

        if self.mode == AgentMode::Script && self.script_path.trim().is_empty() {
            return Err(InjectorError::validation(
                "scriptPath",
                "script mode requires a script path",
            ));
        }

        let name = self.agent_binary_name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(InjectorError::validation(
                "agentBinaryName",
                format!("'{}' must be a bare file name", self.agent_binary_name),
            ));
        }

        Ok(())
    }

    /// Short human-readable summary, e.g. `libgadget.so (server, 0.0.0.0:27042)`.
    pub fn summary(&self) -> String {
        match self.mode {
            AgentMode::Server => format!(
                "{} (server, {}:{})",
                self.agent_binary_name, self.address, self.port
            ),
            AgentMode::Script => format!(
                "{} (script, {})",
                self.agent_binary_name, self.script_path
            ),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::factory_default()
    }
}
