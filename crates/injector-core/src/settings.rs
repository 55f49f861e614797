//! Device-wide settings and presentation preferences.
//!
//! `settings.json` holds what the native loader reads (delay, global agent);
//! `preferences.json` holds the system-app visibility filter.

use crate::config::LimitsConfig;
use crate::models::{AgentConfig, GlobalSettings, Preferences};
use crate::{InjectorError, Result};
use tracing::error;

#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    settings: GlobalSettings,
    preferences: Preferences,
}

impl GlobalConfig {
    /// Wrap loaded documents. An invalid stored global agent is replaced by
    /// the factory default.
    pub fn new(settings: GlobalSettings, preferences: Preferences) -> Self {
        let mut settings = settings.clamped();
        if let Err(e) = settings.default_global_agent.validate() {
            error!("Stored global agent is invalid, using factory default: {}", e);
            settings.default_global_agent = AgentConfig::factory_default();
        }
        Self {
            settings,
            preferences,
        }
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn hide_system_apps(&self) -> bool {
        self.preferences.hide_system_apps
    }

    pub fn set_hide_system_apps(&mut self, hide: bool) {
        self.preferences.hide_system_apps = hide;
    }

    /// Delay in whole seconds, 0..=60.
    pub fn injection_delay_seconds(&self) -> i64 {
        (self.settings.injection_delay_ms / 1000) as i64
    }

    pub fn injection_delay_ms(&self) -> u64 {
        self.settings.injection_delay_ms
    }

    /// Validates only; clamping user input is the caller's job.
    pub fn set_injection_delay_seconds(&mut self, seconds: i64) -> Result<()> {
        if !(0..=LimitsConfig::MAX_INJECTION_DELAY_SECS).contains(&seconds) {
            return Err(InjectorError::validation(
                "injectionDelay",
                format!(
                    "{} is outside 0..={} seconds",
                    seconds,
                    LimitsConfig::MAX_INJECTION_DELAY_SECS
                ),
            ));
        }
        self.settings.injection_delay_ms = seconds as u64 * 1000;
        Ok(())
    }

    pub fn default_global_agent(&self) -> &AgentConfig {
        &self.settings.default_global_agent
    }

    pub fn set_default_global_agent(&mut self, agent: AgentConfig) -> Result<()> {
        agent.validate()?;
        self.settings.default_global_agent = agent;
        Ok(())
    }

    pub fn reset_default_global_agent(&mut self) {
        self.settings.default_global_agent = AgentConfig::factory_default();
    }
}
