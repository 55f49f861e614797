//! Command handlers. Each returns the text printed on stdout.

use crate::cli::{
    clamp_delay_seconds, AgentChoiceArg, AppCommand, Command, InventoryCommand, LibCommand,
    SettingsCommand,
};
use anyhow::{Context, Result};
use injector_core::{build_app_list, AgentSelection, AppListQuery, ConfigStore, StaticInventory};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

pub fn run(store: &ConfigStore, command: Command) -> Result<String> {
    match command {
        Command::Status => status(store),
        Command::Lib(cmd) => lib(store, cmd),
        Command::App(cmd) => app(store, cmd),
        Command::Settings(cmd) => settings(store, cmd),
        Command::Inventory(cmd) => inventory(store, cmd),
        Command::Plan { package } => match package {
            Some(package) => {
                let plan = store.injection_plan(&package)?;
                to_json(&plan)
            }
            None => to_json(&store.injection_plans()?),
        },
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

fn status(store: &ConfigStore) -> Result<String> {
    let mut enabled = Vec::new();
    for pkg in store.configured_packages()? {
        if store.is_enabled(&pkg)? {
            enabled.push(pkg);
        }
    }

    to_json(&json!({
        "librariesDir": store.libraries_dir()?,
        "injectionDelaySeconds": store.injection_delay_seconds()?,
        "hideSystemApps": store.hide_system_apps()?,
        "defaultGlobalAgent": store.default_global_agent()?.summary(),
        "libraryCount": store.list_libraries()?.len(),
        "enabledPackages": enabled,
    }))
}

fn lib(store: &ConfigStore, cmd: LibCommand) -> Result<String> {
    match cmd {
        LibCommand::Import { path, name } => {
            let entry = store
                .add_library(name.as_deref(), &path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            to_json(&entry)
        }
        LibCommand::List => to_json(&store.list_libraries()?),
        LibCommand::Rm { stored_path } => {
            if store.remove_library(&stored_path)? {
                Ok(format!("Removed {}", stored_path))
            } else {
                Ok(format!("Not registered: {}", stored_path))
            }
        }
    }
}

fn app(store: &ConfigStore, cmd: AppCommand) -> Result<String> {
    match cmd {
        AppCommand::Show { package } => to_json(&json!({
            "package": package,
            "config": store.app_config(&package)?,
            "agentChoice": store.agent_choice(&package)?,
            "effectiveAgent": store.effective_agent(&package)?,
            "selectedLibraries": store.selected_libraries(&package)?,
        })),
        AppCommand::Enable { package } => {
            store.set_enabled(&package, true)?;
            Ok(format!("Enabled {}", package))
        }
        AppCommand::Disable { package } => {
            store.set_enabled(&package, false)?;
            Ok(format!("Disabled {}", package))
        }
        AppCommand::Method { package, method } => {
            store.set_injection_method(&package, method)?;
            Ok(format!("{}: method {}", package, method))
        }
        AppCommand::Libs {
            package,
            stored_paths,
        } => {
            store.set_selected_libraries(&package, &stored_paths[..])?;
            Ok(format!("{}: {} libraries selected", package, stored_paths.len()))
        }
        AppCommand::Agent {
            package,
            choice,
            agent,
        } => {
            let selection = match choice {
                AgentChoiceArg::None => AgentSelection::None,
                AgentChoiceArg::Global => AgentSelection::Global,
                AgentChoiceArg::Custom => {
                    // Start from the stored override so flags can edit it
                    let base = match store.app_config(&package)?.agent_override {
                        Some(existing) => existing,
                        None => store.default_global_agent()?,
                    };
                    AgentSelection::Custom(agent.apply(base)?)
                }
            };
            if choice != AgentChoiceArg::Custom && !agent.is_empty() {
                debug!("Agent flags ignored for choice {:?}", choice);
            }
            store.set_agent_choice(&package, selection)?;
            let effective = store
                .effective_agent(&package)?
                .map(|a| a.summary())
                .unwrap_or_else(|| "none".to_string());
            Ok(format!("{}: agent {}", package, effective))
        }
    }
}

fn settings(store: &ConfigStore, cmd: SettingsCommand) -> Result<String> {
    match cmd {
        SettingsCommand::Delay { seconds } => {
            let clamped = clamp_delay_seconds(seconds);
            if clamped != seconds {
                info!("Injection delay {}s clamped to {}s", seconds, clamped);
            }
            store.set_injection_delay_seconds(clamped)?;
            Ok(format!("Injection delay: {}s", clamped))
        }
        SettingsCommand::HideSystem { hide } => {
            store.set_hide_system_apps(hide)?;
            Ok(format!("Hide system apps: {}", hide))
        }
        SettingsCommand::Agent { agent } => {
            let updated = agent.apply(store.default_global_agent()?)?;
            store.set_default_global_agent(updated.clone())?;
            Ok(format!("Global agent: {}", updated.summary()))
        }
        SettingsCommand::AgentReset => {
            store.reset_default_global_agent_to_factory_default()?;
            Ok(format!(
                "Global agent: {}",
                store.default_global_agent()?.summary()
            ))
        }
    }
}

fn inventory(store: &ConfigStore, cmd: InventoryCommand) -> Result<String> {
    match cmd {
        InventoryCommand::List {
            file,
            search,
            show_system,
        } => {
            let inventory = StaticInventory::from_json_file(&file)
                .with_context(|| format!("Failed to read inventory {}", file.display()))?;
            let mut query = AppListQuery::from_preferences(store, search)?;
            if show_system {
                query.hide_system_apps = false;
            }
            to_json(&build_app_list(&inventory, store, &query)?)
        }
        InventoryCommand::Prune { file } => {
            let inventory = StaticInventory::from_json_file(&file)
                .with_context(|| format!("Failed to read inventory {}", file.display()))?;
            let removed = store.prune_orphans(&inventory)?;
            to_json(&removed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn exec(store: &ConfigStore, argv: &[&str]) -> Result<String> {
        let mut full = vec!["injector"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full)?;
        run(store, args.command)
    }

    fn create_test_store() -> (ConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path().join("root")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_status_lists_only_enabled_packages() {
        let (store, _temp) = create_test_store();
        store.set_enabled("com.example.on", true).unwrap();
        store.set_enabled("com.example.off", false).unwrap();

        let out = exec(&store, &["status"]).unwrap();
        let status: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(status["enabledPackages"], json!(["com.example.on"]));
        assert_eq!(status["libraryCount"], 0);
    }

    #[test]
    fn test_delay_is_clamped_before_store() {
        let (store, _temp) = create_test_store();
        let out = exec(&store, &["settings", "delay", "600"]).unwrap();
        assert_eq!(out, "Injection delay: 60s");
        assert_eq!(store.injection_delay_seconds().unwrap(), 60);

        exec(&store, &["settings", "delay", "-3"]).unwrap();
        assert_eq!(store.injection_delay_seconds().unwrap(), 0);
    }

    #[test]
    fn test_import_select_and_plan() {
        let (store, temp_dir) = create_test_store();
        let source = temp_dir.path().join("libhook.so");
        fs::write(&source, b"\x7fELF").unwrap();

        let out = exec(&store, &["lib", "import", source.to_str().unwrap()]).unwrap();
        let entry: serde_json::Value = serde_json::from_str(&out).unwrap();
        let stored_path = entry["storedPath"].as_str().unwrap().to_string();

        exec(&store, &["app", "enable", "com.example"]).unwrap();
        exec(&store, &["app", "libs", "com.example", &stored_path]).unwrap();
        exec(&store, &["app", "agent", "com.example", "none"]).unwrap();

        let out = exec(&store, &["plan", "com.example"]).unwrap();
        let plan: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(plan["libraries"][0]["storedPath"], stored_path.as_str());
        assert!(plan["agent"].is_null());
    }

    #[test]
    fn test_custom_agent_edits_override() {
        let (store, _temp) = create_test_store();
        exec(
            &store,
            &["app", "agent", "com.example", "custom", "--mode", "server", "--port", "9000"],
        )
        .unwrap();
        exec(&store, &["app", "agent", "com.example", "custom", "--port", "9001"]).unwrap();

        let agent = store.agent_override("com.example").unwrap().unwrap();
        assert_eq!(agent.port, 9001);
        assert_eq!(agent.mode, injector_core::AgentMode::Server);
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let (store, _temp) = create_test_store();
        let err = exec(&store, &["settings", "agent", "--port", "0"]).unwrap_err();
        assert!(err.to_string().contains("port"));
        assert_eq!(
            store.default_global_agent().unwrap(),
            injector_core::AgentConfig::factory_default()
        );
    }

    #[test]
    fn test_inventory_list_and_prune() {
        let (store, temp_dir) = create_test_store();
        let file = temp_dir.path().join("inventory.json");
        fs::write(
            &file,
            r#"[
                {"displayName": "Chat", "packageName": "org.example.chat", "lastUpdateMs": 2},
                {"displayName": "System", "packageName": "android", "isSystem": true}
            ]"#,
        )
        .unwrap();
        store.set_enabled("org.example.gone", true).unwrap();
        store.set_hide_system_apps(true).unwrap();

        let file_arg = file.to_str().unwrap();
        let out = exec(&store, &["inventory", "list", "--file", file_arg]).unwrap();
        let list: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);

        let out = exec(&store, &["inventory", "prune", "--file", file_arg]).unwrap();
        assert!(out.contains("org.example.gone"));
        assert!(store.configured_packages().unwrap().is_empty());
    }
}
