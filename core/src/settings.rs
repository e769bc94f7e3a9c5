//! Notification settings for the background-mode foreground service
//!
//! Two layers of settings are tracked:
//! - Defaults: persist for the process lifetime, changed only through `set_defaults`
//! - Runtime settings: live only while the app is in background (active)
//!
//! Every field is optional. An unset field means "key not present" and is
//! omitted from the JSON handed to native code.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Title used by the native notification when none is configured
pub const FALLBACK_TITLE: &str = "App is running in background";
/// Text used by the native notification when none is configured
pub const FALLBACK_TEXT: &str = "Doing heavy tasks.";
/// Icon resource used by the native notification when none is configured
pub const FALLBACK_ICON: &str = "ic_launcher";

// ============================================================================
// NOTIFICATION SETTINGS
// ============================================================================

/// Options recognized by the foreground notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Notification title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Notification body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Render the text with the expanded big-text style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub big_text: Option<bool>,

    /// Tapping the notification brings the app back to foreground
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<bool>,

    /// Accent color as hex (`#RRGGBB`, `RRGGBB` or `#AARRGGBB`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Small icon resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationSettings {
    /// Built-in defaults: `bigText = false`, `resume = true`, everything else unset
    pub fn builtin_defaults() -> Self {
        Self {
            big_text: Some(false),
            resume: Some(true),
            ..Self::default()
        }
    }

    /// True when no key is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.text.is_none()
            && self.big_text.is_none()
            && self.resume.is_none()
            && self.color.is_none()
            && self.icon.is_none()
    }

    /// Replace every key that `overrides` supplies. Keys left unset in
    /// `overrides` keep their current value.
    pub fn apply_overrides(&mut self, overrides: &NotificationSettings) {
        fn replace<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        replace(&mut self.title, &overrides.title);
        replace(&mut self.text, &overrides.text);
        replace(&mut self.big_text, &overrides.big_text);
        replace(&mut self.resume, &overrides.resume);
        replace(&mut self.color, &overrides.color);
        replace(&mut self.icon, &overrides.icon);
    }

    /// Fill the gaps of `self` from `fallback`. A key already set in `self`
    /// is never overwritten.
    pub fn fill_missing(mut self, fallback: &NotificationSettings) -> Self {
        fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if slot.is_none() {
                *slot = value.clone();
            }
        }

        fill(&mut self.title, &fallback.title);
        fill(&mut self.text, &fallback.text);
        fill(&mut self.big_text, &fallback.big_text);
        fill(&mut self.resume, &fallback.resume);
        fill(&mut self.color, &fallback.color);
        fill(&mut self.icon, &fallback.icon);
        self
    }

    /// Parse settings from JSON. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// JSON value in the shape native code expects
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

// ============================================================================
// SETTINGS STORE
// ============================================================================

/// Holds the defaults and the runtime override set
#[derive(Debug, Clone)]
pub struct SettingsStore {
    defaults: NotificationSettings,
    runtime: NotificationSettings,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(NotificationSettings::builtin_defaults())
    }
}

impl SettingsStore {
    pub fn new(defaults: NotificationSettings) -> Self {
        Self {
            defaults,
            runtime: NotificationSettings::default(),
        }
    }

    pub fn defaults(&self) -> &NotificationSettings {
        &self.defaults
    }

    pub fn runtime(&self) -> &NotificationSettings {
        &self.runtime
    }

    /// Overwrite default values with the keys supplied by `overrides`.
    /// Returns the full updated defaults.
    pub fn set_defaults(&mut self, overrides: &NotificationSettings) -> NotificationSettings {
        self.defaults.apply_overrides(overrides);
        debug!("Notification defaults updated: {:?}", self.defaults);
        self.defaults.clone()
    }

    /// Layer `options` over the current runtime settings and then over the
    /// defaults. Stores and returns the result.
    pub fn merge_runtime(&mut self, options: NotificationSettings) -> NotificationSettings {
        let merged = options
            .fill_missing(&self.runtime)
            .fill_missing(&self.defaults);
        self.runtime = merged.clone();
        merged
    }

    /// Runtime settings become a copy of the defaults (app moved to background)
    pub fn reset_to_defaults(&mut self) {
        self.runtime = self.defaults.clone();
        info!("Runtime notification settings reset to defaults");
    }

    /// Runtime settings are dropped (app back in foreground)
    pub fn clear_runtime(&mut self) {
        self.runtime = NotificationSettings::default();
        info!("Runtime notification settings cleared");
    }
}

// ============================================================================
// NOTIFICATION CONTENT
// ============================================================================

/// Concrete notification content after native fallbacks are applied.
///
/// Native implementations get it through `resolve_notification_content`
/// and render the foreground notification without re-implementing the
/// fallback rules.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct NotificationContent {
    pub title: String,
    pub text: String,
    pub icon: String,
    pub big_text_style: bool,
    /// ARGB color, `None` when unset or unparseable
    pub color_argb: Option<u32>,
    pub reopen_on_tap: bool,
}

impl NotificationContent {
    pub fn resolve(settings: &NotificationSettings) -> Self {
        let text = settings
            .text
            .clone()
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());
        let big_text_style = settings.big_text.unwrap_or(false) || text.contains('\n');

        Self {
            title: settings
                .title
                .clone()
                .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            icon: settings
                .icon
                .clone()
                .filter(|icon| !icon.is_empty())
                .unwrap_or_else(|| FALLBACK_ICON.to_string()),
            color_argb: settings.color.as_deref().and_then(parse_color),
            reopen_on_tap: settings.resume.unwrap_or(false),
            big_text_style,
            text,
        }
    }
}

/// Parse `#RRGGBB`, `RRGGBB`, `#AARRGGBB` or `AARRGGBB` into ARGB.
///
/// Six-digit colors are fully opaque.
pub fn parse_color(hex: &str) -> Option<u32> {
    let digits: String = hex.chars().filter(|c| *c != '#').collect();
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match digits.len() {
        6 => u32::from_str_radix(&digits, 16).ok().map(|rgb| 0xFF00_0000 | rgb),
        8 => u32::from_str_radix(&digits, 16).ok(),
        _ => None,
    }
}
