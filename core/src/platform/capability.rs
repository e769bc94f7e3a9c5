//! Platform capability descriptor
//!
//! Resolved once when the platform reports ready, then injected into the
//! controller so call sites never inspect the platform name again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the host platform can do in terms of background execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum PlatformCapability {
    /// Distinct foreground/background states and a native background mode
    /// (Android, Amazon Fire OS)
    BackgroundCapable,
    /// No background notion: the app always counts as active (browser)
    AlwaysActive,
    /// Background mode is not available
    Unsupported,
}

impl PlatformCapability {
    /// Resolve from the platform name reported by the host
    /// (`"Android"`, `"amazon-fireos"`, `"browser"`, `"iOS"`, ...)
    pub fn detect(platform: &str) -> Self {
        let name = platform.trim().to_ascii_lowercase();

        if name.starts_with("android") || name.contains("amazon") {
            Self::BackgroundCapable
        } else if name == "browser" {
            Self::AlwaysActive
        } else {
            Self::Unsupported
        }
    }

    pub fn is_background_capable(self) -> bool {
        matches!(self, Self::BackgroundCapable)
    }

    /// Initial value of `isActive` right after initialization
    pub fn starts_active(self) -> bool {
        matches!(self, Self::AlwaysActive)
    }
}

impl fmt::Display for PlatformCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackgroundCapable => write!(f, "BackgroundCapable"),
            Self::AlwaysActive => write!(f, "AlwaysActive"),
            Self::Unsupported => write!(f, "Unsupported"),
        }
    }
}
