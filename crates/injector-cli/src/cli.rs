//! Command-line arguments.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use injector_core::config::LimitsConfig;
use injector_core::{AgentConfig, AgentMode, InjectionMethod, LoadBehavior, PortConflictPolicy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "injector")]
#[command(about = "Manage per-application injection configuration")]
#[command(version)]
pub struct Args {
    /// Store root directory
    #[arg(long, env = "INJECTOR_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// `--root`, then `INJECTOR_ROOT`, then the platform data directory.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("injector"))
                .context("No data directory on this platform; pass --root"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show global settings and enabled packages
    Status,

    /// Manage the library registry
    #[command(subcommand)]
    Lib(LibCommand),

    /// Configure one package
    #[command(subcommand)]
    App(AppCommand),

    /// Device-wide settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Work against an exported list of installed applications
    #[command(subcommand)]
    Inventory(InventoryCommand),

    /// Print resolved injection plans as JSON
    Plan {
        /// Only this package
        package: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibCommand {
    /// Copy a shared library into managed storage
    Import {
        path: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered libraries
    List,
    /// Unregister a library and delete its managed copy
    Rm { stored_path: String },
}

#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Show the stored and resolved configuration
    Show { package: String },
    Enable { package: String },
    Disable { package: String },
    /// Set the injection method (standard, riru, custom_linker)
    Method {
        package: String,
        method: InjectionMethod,
    },
    /// Replace the selected libraries; no paths clears the selection
    Libs {
        package: String,
        stored_paths: Vec<String>,
    },
    /// Choose no agent, the global agent, or a custom one
    Agent {
        package: String,
        choice: AgentChoiceArg,
        #[command(flatten)]
        agent: AgentArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentChoiceArg {
    None,
    Global,
    Custom,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Injection delay in seconds, clamped to 0..=60
    Delay {
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
    /// Hide system apps in app lists
    HideSystem {
        #[arg(action = ArgAction::Set)]
        hide: bool,
    },
    /// Change the global default agent
    Agent {
        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Restore the factory default agent
    AgentReset,
}

#[derive(Subcommand, Debug)]
pub enum InventoryCommand {
    /// List installed apps with their enabled state
    List {
        /// JSON array of installed apps
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "")]
        search: String,
        /// Include system apps even if the preference hides them
        #[arg(long)]
        show_system: bool,
    },
    /// Remove configuration of packages that are not installed
    Prune {
        #[arg(long)]
        file: PathBuf,
    },
}

/// Agent fields; unset flags keep the base config's value.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct AgentArgs {
    /// script or server
    #[arg(long)]
    pub mode: Option<AgentMode>,
    /// Listen address in server mode
    #[arg(long)]
    pub address: Option<String>,
    /// Listen port in server mode
    #[arg(long)]
    pub port: Option<i64>,
    /// fail or pick-other
    #[arg(long)]
    pub on_port_conflict: Option<PortConflictPolicy>,
    /// wait or resume
    #[arg(long)]
    pub on_load: Option<LoadBehavior>,
    /// Script to run in script mode
    #[arg(long)]
    pub script_path: Option<String>,
    /// File name of the agent library
    #[arg(long)]
    pub agent_name: Option<String>,
}

impl AgentArgs {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.address.is_none()
            && self.port.is_none()
            && self.on_port_conflict.is_none()
            && self.on_load.is_none()
            && self.script_path.is_none()
            && self.agent_name.is_none()
    }

    /// Overlay the given flags on `base`.
    pub fn apply(&self, mut base: AgentConfig) -> injector_core::Result<AgentConfig> {
        if let Some(mode) = self.mode {
            base.mode = mode;
        }
        if let Some(address) = &self.address {
            base.address = address.clone();
        }
        if let Some(port) = self.port {
            base.port = AgentConfig::parse_port(port)?;
        }
        if let Some(policy) = self.on_port_conflict {
            base.on_port_conflict = policy;
        }
        if let Some(on_load) = self.on_load {
            base.on_load = on_load;
        }
        if let Some(script_path) = &self.script_path {
            base.script_path = script_path.clone();
        }
        if let Some(name) = &self.agent_name {
            base.agent_binary_name = name.clone();
        }
        Ok(base)
    }
}

/// Clamp user input into the range the store accepts.
pub fn clamp_delay_seconds(seconds: i64) -> i64 {
    seconds.clamp(0, LimitsConfig::MAX_INJECTION_DELAY_SECS)
}
