// Configuration management for the bgmode CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/bgmode/config.json
// - Linux: ~/.config/bgmode/config.json
// - Windows: %APPDATA%\bgmode\config.json

use anyhow::{Context, Result};
use bgmode_core::{BridgeConfig, NotificationSettings};
use std::path::{Path, PathBuf};

/// Bridge config plus the file it lives in
#[derive(Debug, Clone)]
pub struct Config {
    pub bridge: BridgeConfig,
    path: PathBuf,
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("bgmode");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Directory for rolling log files
    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("bgmode")
            .join("logs");

        std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

        Ok(log_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load the config from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_file()?)
    }

    /// Load from `path`, writing a default config there if it does not exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let bridge = BridgeConfig::load(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Ok(Self { bridge, path })
        } else {
            let config = Self {
                bridge: BridgeConfig::default(),
                path,
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let contents = self
            .bridge
            .to_json_pretty()
            .context("Failed to serialize config")?;
        std::fs::write(&self.path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Set a config value. Notification defaults use a `defaults.` prefix.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |value: &str| {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        let mut bridge = self.bridge.clone();
        match key {
            "platform" => bridge.platform = optional(value),
            "log_filter" => bridge.log_filter = value.to_string(),
            "isolate_listener_panics" => {
                bridge.isolate_listener_panics =
                    value.parse().context("Invalid boolean value")?;
            }
            "defaults.title" => bridge.defaults.title = optional(value),
            "defaults.text" => bridge.defaults.text = optional(value),
            "defaults.color" => bridge.defaults.color = optional(value),
            "defaults.icon" => bridge.defaults.icon = optional(value),
            "defaults.bigText" => {
                bridge.defaults.big_text =
                    Some(value.parse().context("Invalid boolean value")?);
            }
            "defaults.resume" => {
                bridge.defaults.resume = Some(value.parse().context("Invalid boolean value")?);
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        bridge.validate()?;
        self.bridge = bridge;
        self.save()?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let defaults = &self.bridge.defaults;
        match key {
            "platform" => self.bridge.platform.clone(),
            "log_filter" => Some(self.bridge.log_filter.clone()),
            "isolate_listener_panics" => Some(self.bridge.isolate_listener_panics.to_string()),
            "defaults.title" => defaults.title.clone(),
            "defaults.text" => defaults.text.clone(),
            "defaults.color" => defaults.color.clone(),
            "defaults.icon" => defaults.icon.clone(),
            "defaults.bigText" => defaults.big_text.map(|v| v.to_string()),
            "defaults.resume" => defaults.resume.map(|v| v.to_string()),
            _ => None,
        }
    }

    /// All values, with the built-in defaults filled in
    pub fn list(&self) -> Vec<(String, String)> {
        let effective: NotificationSettings = self.bridge.effective_defaults();
        let show = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());

        vec![
            ("platform".to_string(), show(self.bridge.platform.clone())),
            ("log_filter".to_string(), self.bridge.log_filter.clone()),
            (
                "isolate_listener_panics".to_string(),
                self.bridge.isolate_listener_panics.to_string(),
            ),
            ("defaults.title".to_string(), show(effective.title)),
            ("defaults.text".to_string(), show(effective.text)),
            (
                "defaults.bigText".to_string(),
                show(effective.big_text.map(|v| v.to_string())),
            ),
            (
                "defaults.resume".to_string(),
                show(effective.resume.map(|v| v.to_string())),
            ),
            ("defaults.color".to_string(), show(effective.color)),
            ("defaults.icon".to_string(), show(effective.icon)),
        ]
    }
}
