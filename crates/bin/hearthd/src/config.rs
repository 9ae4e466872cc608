//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `hearth.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use hearth_app::executor::ExecutionLimits;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Action execution bounds.
    pub automation: AutomationConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Notification channel settings.
    pub notifications: NotificationsConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Deepest nesting of recursive actions still executed.
    pub max_recursion: usize,
    /// Longest accepted sub-action delay, in milliseconds.
    pub max_sub_action_delay_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document loaded into the stores at startup.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Broadcast channel capacity.
    pub capacity: usize,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo devices.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from `hearth.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("hearth.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HEARTH_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(depth) = var("HEARTH_MAX_RECURSION").and_then(|val| val.parse().ok()) {
            self.automation.max_recursion = depth;
        }
        if let Some(delay) = var("HEARTH_MAX_DELAY_MS").and_then(|val| val.parse().ok()) {
            self.automation.max_sub_action_delay_ms = delay;
        }
        if let Some(val) = var("HEARTH_SEED_FILE") {
            self.storage.seed_file = Some(PathBuf::from(val));
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.automation.max_sub_action_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "max_sub_action_delay_ms must be non-zero".to_string(),
            ));
        }
        if self.notifications.capacity == 0 {
            return Err(ConfigError::Validation(
                "notification capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Execution bounds handed to the action executor.
    #[must_use]
    pub fn execution_limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_recursion: self.automation.max_recursion,
            max_delay: Duration::from_millis(self.automation.max_sub_action_delay_ms),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hearthd=info,hearth=info".to_string(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            max_recursion: 10,
            max_sub_action_delay_ms: 60_000,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.filter, "hearthd=info,hearth=info");
        assert_eq!(config.automation.max_recursion, 10);
        assert_eq!(config.automation.max_sub_action_delay_ms, 60_000);
        assert!(config.storage.seed_file.is_none());
        assert_eq!(config.notifications.capacity, 64);
        assert!(config.integrations.virtual_enabled);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.automation.max_recursion, 10);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [logging]
            filter = 'debug'

            [automation]
            max_recursion = 3
            max_sub_action_delay_ms = 1500

            [storage]
            seed_file = 'seed.json'

            [notifications]
            capacity = 8

            [integrations]
            virtual_enabled = false
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.automation.max_recursion, 3);
        assert_eq!(config.automation.max_sub_action_delay_ms, 1500);
        assert_eq!(config.storage.seed_file, Some(PathBuf::from("seed.json")));
        assert_eq!(config.notifications.capacity, 8);
        assert!(!config.integrations.virtual_enabled);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [automation]
            max_recursion = 4
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.automation.max_recursion, 4);
        assert_eq!(config.automation.max_sub_action_delay_ms, 60_000);
        assert_eq!(config.notifications.capacity, 64);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.notifications.capacity, 64);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_prefer_rust_log_over_hearth_log_when_both_are_set() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("HEARTH_LOG", "warn"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_apply_automation_overrides_when_env_is_set() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("HEARTH_MAX_RECURSION", "2"),
            ("HEARTH_MAX_DELAY_MS", "250"),
            ("HEARTH_SEED_FILE", "/etc/hearth/seed.json"),
        ]));
        assert_eq!(config.automation.max_recursion, 2);
        assert_eq!(config.automation.max_sub_action_delay_ms, 250);
        assert_eq!(
            config.storage.seed_file,
            Some(PathBuf::from("/etc/hearth/seed.json"))
        );
    }

    #[test]
    fn should_ignore_unparsable_numeric_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("HEARTH_MAX_RECURSION", "deep")]));
        assert_eq!(config.automation.max_recursion, 10);
    }

    #[test]
    fn should_reject_zero_delay() {
        let mut config = Config::default();
        config.automation.max_sub_action_delay_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_capacity() {
        let mut config = Config::default();
        config.notifications.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_convert_to_execution_limits() {
        let mut config = Config::default();
        config.automation.max_sub_action_delay_ms = 1500;
        let limits = config.execution_limits();
        assert_eq!(limits.max_recursion, 10);
        assert_eq!(limits.max_delay, Duration::from_millis(1500));
    }
}
