// bgmode core — background-mode bridge
//
// Keeps the hosted web app informed about background execution state and
// relays its requests to native platform code. The heavy lifting (foreground
// service, wake locks, notification rendering) happens natively; this crate
// owns the event registry, the lifecycle flags and the notification settings.

pub mod config;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod platform;
pub mod settings;

// Mobile bridge module
pub mod mobile_bridge;

pub use config::{BridgeConfig, ConfigError};
pub use events::{
    listener, Delivery, DeliveryReport, EventBus, FailureKind, GlobalScope, LifecycleEvent,
    Listener, ListenerFailure, ListenerScope,
};
pub use lifecycle::{BackgroundMode, LifecycleError, LifecycleState};
pub use platform::{
    AppStartDialog, AppStartOptions, NativeCall, NativeControlSurface, NativeError, NativeReply,
    NativeResult, NativeService, PlatformCapability,
};
pub use settings::{NotificationContent, NotificationSettings, SettingsStore};

// Mobile bridge exports for UniFFI
pub use mobile_bridge::*;

uniffi::setup_scaffolding!();
