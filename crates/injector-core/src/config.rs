//! Centralized configuration for the injector store.
//!
//! Directory and document names, factory defaults for the agent, and numeric
//! limits enforced at the store boundary.

/// On-disk layout below the store root.
pub struct PathsConfig;

impl PathsConfig {
    pub const CONFIG_DIR_NAME: &'static str = "config";
    pub const LIBRARIES_DIR_NAME: &'static str = "libraries";
    pub const SETTINGS_FILENAME: &'static str = "settings.json";
    pub const PREFERENCES_FILENAME: &'static str = "preferences.json";
    pub const LIBRARIES_FILENAME: &'static str = "libraries.json";
    pub const APPS_FILENAME: &'static str = "apps.json";
}

/// Schema versions written into every persisted document.
pub struct SchemaConfig;

impl SchemaConfig {
    pub const CURRENT_VERSION: u32 = 1;
}

/// Factory defaults for the in-process instrumentation agent.
pub struct AgentDefaults;

impl AgentDefaults {
    pub const ADDRESS: &'static str = "0.0.0.0";
    pub const PORT: u16 = 27042;
    pub const SCRIPT_PATH: &'static str = "/data/local/tmp/script.js";
    pub const BINARY_NAME: &'static str = "libgadget.so";
}

/// Numeric limits enforced by the store.
pub struct LimitsConfig;

impl LimitsConfig {
    pub const MAX_INJECTION_DELAY_SECS: i64 = 60;
    pub const MAX_INJECTION_DELAY_MS: u64 = 60_000;
    pub const MIN_PORT: u32 = 1;
    pub const MAX_PORT: u32 = 65_535;
    /// Hex characters of the content hash used as the stored file name prefix.
    pub const STORED_HASH_PREFIX_LEN: usize = 16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_limits_agree() {
        assert_eq!(
            LimitsConfig::MAX_INJECTION_DELAY_MS,
            LimitsConfig::MAX_INJECTION_DELAY_SECS as u64 * 1000
        );
    }

    #[test]
    fn test_default_port_in_range() {
        let port = AgentDefaults::PORT as u32;
        assert!((LimitsConfig::MIN_PORT..=LimitsConfig::MAX_PORT).contains(&port));
    }
}
