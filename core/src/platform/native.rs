//! Native Control Surface seam
//!
//! Everything that actually keeps the app alive (foreground service, wake
//! locks, notification rendering, task-list and battery tweaks) lives in
//! platform code. The core reaches it through a single `exec` entry point
//! carrying a fixed operation and its positional arguments, the same shape
//! a Cordova-style `exec(service, action, args)` bridge expects.

use crate::settings::NotificationSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Failure reported by native code, surfaced verbatim to the caller
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct NativeError {
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for NativeError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for NativeError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

// ============================================================================
// CALLS
// ============================================================================

/// Native plugin class a call is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeService {
    /// Core mode switching and notification configuration
    BackgroundMode,
    /// Device tweaks: battery, webview, task list, screen and wake state
    BackgroundModeExt,
}

impl NativeService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackgroundMode => "BackgroundMode",
            Self::BackgroundModeExt => "BackgroundModeExt",
        }
    }
}

/// Contents of the confirmation dialog shown before opening app-start settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStartDialog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// How the manufacturer app-start settings are opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppStartOptions {
    /// `false` opens the settings directly, `true` asks for confirmation first
    Confirm(bool),
    /// Ask for confirmation with a custom dialog
    Dialog(AppStartDialog),
}

impl Default for AppStartOptions {
    fn default() -> Self {
        Self::Confirm(true)
    }
}

/// Operation requested from native code
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Enable,
    Disable,
    /// `live_update` false persists defaults; true updates the running notification
    Configure {
        settings: NotificationSettings,
        live_update: bool,
    },
    RequestPermissions,
    Webview,
    Battery,
    AppStart(AppStartOptions),
    Background,
    Foreground,
    TasklistExclude,
    TasklistInclude,
    /// Replies with a boolean: true when the screen is off
    Dimmed,
    Wakeup,
    Unlock,
}

impl NativeCall {
    pub fn service(&self) -> NativeService {
        match self {
            Self::Enable | Self::Disable | Self::Configure { .. } | Self::RequestPermissions => {
                NativeService::BackgroundMode
            }
            _ => NativeService::BackgroundModeExt,
        }
    }

    /// Action name understood by the native plugin
    pub fn action(&self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Configure { .. } => "configure",
            Self::RequestPermissions => "requestPermissions",
            Self::Webview => "webview",
            Self::Battery => "battery",
            Self::AppStart(_) => "appstart",
            Self::Background => "background",
            Self::Foreground => "foreground",
            Self::TasklistExclude => "tasklistExclude",
            Self::TasklistInclude => "tasklistInclude",
            Self::Dimmed => "dimmed",
            Self::Wakeup => "wakeup",
            Self::Unlock => "unlock",
        }
    }

    /// Positional arguments
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::Configure {
                settings,
                live_update,
            } => vec![settings.to_json_value(), Value::Bool(*live_update)],
            Self::AppStart(options) => {
                vec![serde_json::to_value(options).unwrap_or(Value::Bool(true))]
            }
            _ => Vec::new(),
        }
    }

    /// Rebuild a call from its wire form (`action` plus positional args)
    pub fn from_wire(action: &str, args: &[Value]) -> Option<Self> {
        let call = match action {
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "configure" => Self::Configure {
                settings: args
                    .first()
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
                live_update: args.get(1).and_then(Value::as_bool).unwrap_or(false),
            },
            "requestPermissions" => Self::RequestPermissions,
            "webview" => Self::Webview,
            "battery" => Self::Battery,
            "appstart" => Self::AppStart(
                args.first()
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
            ),
            "background" => Self::Background,
            "foreground" => Self::Foreground,
            "tasklistExclude" => Self::TasklistExclude,
            "tasklistInclude" => Self::TasklistInclude,
            "dimmed" => Self::Dimmed,
            "wakeup" => Self::Wakeup,
            "unlock" => Self::Unlock,
            _ => return None,
        };
        Some(call)
    }
}

// ============================================================================
// SURFACE
// ============================================================================

/// Reply payload: success value (usually `null`) or the native failure
pub type NativeResult = Result<Value, NativeError>;

/// One-shot reply handed to native code along with a call
pub type NativeReply = Box<dyn FnOnce(NativeResult) + Send>;

/// Callback interface implemented by platform code
#[cfg_attr(test, mockall::automock)]
pub trait NativeControlSurface: Send + Sync {
    /// Execute `call`. When `reply` is present it must be invoked at most
    /// once, from any thread, possibly before `exec` returns. A call that is
    /// never answered stays pending forever.
    fn exec(&self, call: NativeCall, reply: Option<NativeReply>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_routing() {
        assert_eq!(NativeCall::Enable.service(), NativeService::BackgroundMode);
        assert_eq!(
            NativeCall::RequestPermissions.service(),
            NativeService::BackgroundMode
        );
        assert_eq!(NativeCall::Dimmed.service(), NativeService::BackgroundModeExt);
        assert_eq!(
            NativeCall::TasklistExclude.service().as_str(),
            "BackgroundModeExt"
        );
    }

    #[test]
    fn test_configure_args() {
        let call = NativeCall::Configure {
            settings: NotificationSettings {
                title: Some("Sync".to_string()),
                ..Default::default()
            },
            live_update: true,
        };

        let args = call.args();
        assert_eq!(call.action(), "configure");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0]["title"], Value::from("Sync"));
        assert_eq!(args[1], Value::Bool(true));
    }

    #[test]
    fn test_app_start_args() {
        let direct = NativeCall::AppStart(AppStartOptions::Confirm(false));
        assert_eq!(direct.args(), vec![Value::Bool(false)]);

        let dialog = NativeCall::AppStart(AppStartOptions::Dialog(AppStartDialog {
            title: Some("Keep running".to_string()),
            text: None,
        }));
        assert_eq!(dialog.args()[0]["title"], Value::from("Keep running"));
    }

    #[test]
    fn test_from_wire() {
        let call = NativeCall::from_wire(
            "configure",
            &[serde_json::json!({"text": "hello"}), Value::Bool(false)],
        )
        .unwrap();

        assert_eq!(
            call,
            NativeCall::Configure {
                settings: NotificationSettings {
                    text: Some("hello".to_string()),
                    ..Default::default()
                },
                live_update: false,
            }
        );
        assert_eq!(NativeCall::from_wire("wakeup", &[]), Some(NativeCall::Wakeup));
        assert_eq!(NativeCall::from_wire("explode", &[]), None);
    }

    #[test]
    fn test_native_error_display_is_verbatim() {
        let err = NativeError::from("Notification permission denied");
        assert_eq!(err.to_string(), "Notification permission denied");
    }
}
