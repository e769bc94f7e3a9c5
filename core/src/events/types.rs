//! Event names understood by the background-mode bridge

use std::fmt;

/// Lifecycle events fired by the controller or by native code.
///
/// Applications may also fire and listen to their own event names; those
/// travel as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Background mode was switched on
    Enable,
    /// Background mode was switched off
    Disable,
    /// App went to background while enabled (foreground service running)
    Activate,
    /// App came back to foreground
    Deactivate,
    /// Native side failed to start the foreground service
    Failure,
    Custom(String),
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Failure => "failure",
            Self::Custom(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<&str> for LifecycleEvent {
    fn from(name: &str) -> Self {
        match name {
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "activate" => Self::Activate,
            "deactivate" => Self::Deactivate,
            "failure" => Self::Failure,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
