//! Bridge configuration
//!
//! Loaded from JSON by the host application (or the CLI). Every field has a
//! default, so an empty object is a valid configuration.

use crate::platform::PlatformCapability;
use crate::settings::NotificationSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Platform name ("android", "browser", ...) used when the host reports
    /// an empty one at readiness time
    pub platform: Option<String>,

    /// Notification defaults layered over the built-in ones
    pub defaults: NotificationSettings,

    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Catch listener panics instead of unwinding through `fire_event`
    pub isolate_listener_panics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform: None,
            defaults: NotificationSettings::default(),
            log_filter: "info".to_string(),
            isolate_listener_panics: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "log_filter cannot be empty".to_string(),
            ));
        }

        if let Some(color) = &self.defaults.color {
            if crate::settings::parse_color(color).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "defaults.color is not a hex color: {}",
                    color
                )));
            }
        }

        Ok(())
    }

    /// Built-in defaults with the configured ones applied on top
    pub fn effective_defaults(&self) -> NotificationSettings {
        let mut defaults = NotificationSettings::builtin_defaults();
        defaults.apply_overrides(&self.defaults);
        defaults
    }

    /// Capability for the configured platform override, if any
    pub fn platform_capability(&self) -> Option<PlatformCapability> {
        self.platform.as_deref().map(PlatformCapability::detect)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.effective_defaults(), NotificationSettings::builtin_defaults());
    }

    #[test]
    fn test_defaults_layer_over_builtin() {
        let config = BridgeConfig::from_json_str(
            r#"{"platform":"Android","defaults":{"title":"Tracking","resume":false}}"#,
        )
        .unwrap();

        let defaults = config.effective_defaults();
        assert_eq!(defaults.title.as_deref(), Some("Tracking"));
        assert_eq!(defaults.resume, Some(false));
        assert_eq!(defaults.big_text, Some(false));
        assert_eq!(
            config.platform_capability(),
            Some(PlatformCapability::BackgroundCapable)
        );
    }

    #[test]
    fn test_invalid_color_rejected() {
        let result = BridgeConfig::from_json_str(r#"{"defaults":{"color":"blue"}}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_log_filter_rejected() {
        let result = BridgeConfig::from_json_str(r#"{"log_filter":"  "}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"log_filter":"debug","isolate_listener_panics":false}}"#).unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.log_filter, "debug");
        assert!(!config.isolate_listener_panics);
    }

    #[test]
    fn test_load_missing_file() {
        let result = BridgeConfig::load("/nonexistent/bgmode/config.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
