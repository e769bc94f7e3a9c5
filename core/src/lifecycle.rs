//! Background-mode lifecycle controller
//!
//! `BackgroundMode` is the context object the host application creates once
//! at startup. It tracks two independent flags:
//! - `enabled`: changed only by successful enable/disable round-trips
//! - `active`: changed only by `activate`/`deactivate` events from native code
//!
//! Platform readiness triggers `initialize`, application readiness triggers
//! `application_ready`. Everything else is called by the application.

use crate::config::BridgeConfig;
use crate::events::{
    listener, DeliveryReport, EventBus, LifecycleEvent, Listener, ListenerFailure, ListenerScope,
};
use crate::platform::{AppStartOptions, NativeCall, NativeControlSurface, NativeError, PlatformCapability};
use crate::settings::{NotificationSettings, SettingsStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

/// Reported when native code drops a reply without answering
const REPLY_DROPPED: &str = "Native bridge dropped the reply";

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Background mode already initialized ({0})")]
    AlreadyInitialized(PlatformCapability),
}

// ============================================================================
// STATE
// ============================================================================

/// Snapshot of the two lifecycle flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub enabled: bool,
    pub active: bool,
}

struct Inner {
    native: Arc<dyn NativeControlSurface>,
    capability: OnceLock<PlatformCapability>,
    configured_platform: Option<String>,
    state: Mutex<LifecycleState>,
    settings: Mutex<SettingsStore>,
    bus: EventBus,
    back_button_overridden: AtomicBool,
}

impl Inner {
    fn capability(&self) -> PlatformCapability {
        self.capability
            .get()
            .copied()
            .unwrap_or(PlatformCapability::Unsupported)
    }

    fn fire(&self, event: LifecycleEvent, args: &[Value]) -> DeliveryReport {
        self.bus.fire_event(event.as_str(), args)
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Background-mode controller. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BackgroundMode {
    inner: Arc<Inner>,
}

impl fmt::Debug for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundMode")
            .field("capability", &self.inner.capability.get())
            .field("state", &self.state())
            .finish()
    }
}

impl BackgroundMode {
    pub fn new(native: Arc<dyn NativeControlSurface>) -> Self {
        Self::with_config(native, &BridgeConfig::default())
    }

    pub fn with_config(native: Arc<dyn NativeControlSurface>, config: &BridgeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                native,
                capability: OnceLock::new(),
                configured_platform: config.platform.clone(),
                state: Mutex::new(LifecycleState::default()),
                settings: Mutex::new(SettingsStore::new(config.effective_defaults())),
                bus: EventBus::with_panic_isolation(config.isolate_listener_panics),
                back_button_overridden: AtomicBool::new(false),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Readiness signals
    // ------------------------------------------------------------------------

    /// Platform-readiness signal. Runs once; later calls fail.
    pub fn initialize(&self, capability: PlatformCapability) -> Result<(), LifecycleError> {
        if self.inner.capability.set(capability).is_err() {
            return Err(LifecycleError::AlreadyInitialized(self.inner.capability()));
        }

        *self.inner.state.lock() = LifecycleState {
            enabled: false,
            active: capability.starts_active(),
        };

        if capability.is_background_capable() {
            self.register_internal_handlers();
        }

        tracing::info!("Background mode initialized ({})", capability);
        Ok(())
    }

    /// Resolve the capability from a platform name, then initialize.
    /// An empty name falls back to the configured platform.
    pub fn initialize_for_platform(
        &self,
        platform: &str,
    ) -> Result<PlatformCapability, LifecycleError> {
        let platform = match self.inner.configured_platform.as_deref() {
            Some(configured) if platform.trim().is_empty() => configured,
            _ => platform,
        };
        let capability = PlatformCapability::detect(platform);
        self.initialize(capability)?;
        Ok(capability)
    }

    /// Application-readiness signal: replay the current state to listeners
    /// registered before this point. `enable` first, then `activate`.
    pub fn application_ready(&self) {
        let state = self.state();

        if state.enabled {
            self.inner.fire(LifecycleEvent::Enable, &[]);
        }

        if state.active {
            self.inner.fire(LifecycleEvent::Activate, &[]);
        }
    }

    fn register_internal_handlers(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.bus.on(
            LifecycleEvent::Activate.as_str(),
            listener(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().active = true;
                    inner.settings.lock().reset_to_defaults();
                    tracing::info!("Background mode activated");
                }
                Ok(())
            }),
        );

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.bus.on(
            LifecycleEvent::Deactivate.as_str(),
            listener(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().active = false;
                    inner.settings.lock().clear_runtime();
                    tracing::info!("Background mode deactivated");
                }
                Ok(())
            }),
        );
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    pub fn capability(&self) -> PlatformCapability {
        self.inner.capability()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.capability.get().is_some()
    }

    pub fn is_background_capable(&self) -> bool {
        self.capability().is_background_capable()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    pub fn get_defaults(&self) -> NotificationSettings {
        self.inner.settings.lock().defaults().clone()
    }

    /// Overwrite defaults with the keys `overrides` supplies and persist
    /// them natively as non-transient defaults.
    pub fn set_defaults(&self, overrides: &NotificationSettings) {
        let updated = self.inner.settings.lock().set_defaults(overrides);

        if self.is_background_capable() {
            self.inner.native.exec(
                NativeCall::Configure {
                    settings: updated,
                    live_update: false,
                },
                None,
            );
        }
    }

    /// Current runtime settings; empty while inactive
    pub fn get_settings(&self) -> NotificationSettings {
        self.inner.settings.lock().runtime().clone()
    }

    /// Update the running notification. Keys in `options` win over the
    /// current runtime settings, which win over the defaults.
    ///
    /// Skipped (with a log line only) while background mode is not active.
    pub fn configure(&self, options: NotificationSettings) {
        if !self.is_background_capable() {
            tracing::debug!("configure skipped: platform has no background mode");
            return;
        }

        if !self.is_active() {
            tracing::info!("Background Mode is not active, configuration skipped...");
            return;
        }

        let merged = self.inner.settings.lock().merge_runtime(options);
        self.inner.native.exec(
            NativeCall::Configure {
                settings: merged,
                live_update: true,
            },
            None,
        );
    }

    // ------------------------------------------------------------------------
    // Enable / disable
    // ------------------------------------------------------------------------

    /// Switch background mode on. `done` runs exactly once, synchronously
    /// when already enabled, otherwise after native code answers.
    pub fn enable<F>(&self, done: F)
    where
        F: FnOnce(Result<(), NativeError>) + Send + 'static,
    {
        if self.is_enabled() {
            done(Ok(()));
            return;
        }

        self.toggle(true, done);
    }

    /// Switch background mode off. Symmetric to [`enable`](Self::enable).
    pub fn disable<F>(&self, done: F)
    where
        F: FnOnce(Result<(), NativeError>) + Send + 'static,
    {
        if !self.is_enabled() {
            done(Ok(()));
            return;
        }

        self.toggle(false, done);
    }

    pub fn set_enabled<F>(&self, enabled: bool, done: F)
    where
        F: FnOnce(Result<(), NativeError>) + Send + 'static,
    {
        if enabled {
            self.enable(done);
        } else {
            self.disable(done);
        }
    }

    fn toggle<F>(&self, enabled: bool, done: F)
    where
        F: FnOnce(Result<(), NativeError>) + Send + 'static,
    {
        let (call, event) = if enabled {
            (NativeCall::Enable, LifecycleEvent::Enable)
        } else {
            (NativeCall::Disable, LifecycleEvent::Disable)
        };

        let weak = Arc::downgrade(&self.inner);
        self.inner.native.exec(
            call,
            Some(Box::new(move |result| match result {
                Ok(_) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.state.lock().enabled = enabled;
                        tracing::info!("Background mode {}d", event);
                        inner.fire(event, &[]);
                    }
                    done(Ok(()));
                }
                Err(err) => {
                    tracing::warn!("Native {} failed: {}", event, err);
                    done(Err(err));
                }
            })),
        );
    }

    /// Ask for notification permission. Immediate success on platforms
    /// without a background mode.
    pub fn request_permissions<F>(&self, done: F)
    where
        F: FnOnce(Result<(), NativeError>) + Send + 'static,
    {
        if !self.is_background_capable() {
            done(Ok(()));
            return;
        }

        self.inner.native.exec(
            NativeCall::RequestPermissions,
            Some(Box::new(move |result| done(result.map(|_| ())))),
        );
    }

    // ------------------------------------------------------------------------
    // Async wrappers
    // ------------------------------------------------------------------------

    pub async fn enable_async(&self) -> Result<(), NativeError> {
        let (tx, rx) = oneshot::channel();
        self.enable(move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .unwrap_or_else(|_| Err(NativeError::new(REPLY_DROPPED)))
    }

    pub async fn disable_async(&self) -> Result<(), NativeError> {
        let (tx, rx) = oneshot::channel();
        self.disable(move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .unwrap_or_else(|_| Err(NativeError::new(REPLY_DROPPED)))
    }

    pub async fn set_enabled_async(&self, enabled: bool) -> Result<(), NativeError> {
        if enabled {
            self.enable_async().await
        } else {
            self.disable_async().await
        }
    }

    pub async fn request_permissions_async(&self) -> Result<(), NativeError> {
        let (tx, rx) = oneshot::channel();
        self.request_permissions(move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .unwrap_or_else(|_| Err(NativeError::new(REPLY_DROPPED)))
    }

    /// `None` when the platform cannot tell or native code gave no answer
    pub async fn is_screen_off_async(&self) -> Option<bool> {
        let (tx, rx) = oneshot::channel();
        self.is_screen_off(move |off| {
            let _ = tx.send(off);
        });
        rx.await.ok().flatten()
    }

    // ------------------------------------------------------------------------
    // Native forwards
    // ------------------------------------------------------------------------

    fn forward(&self, call: NativeCall) {
        if self.is_background_capable() {
            tracing::debug!("Forwarding {} to native", call.action());
            self.inner.native.exec(call, None);
        } else {
            tracing::debug!("{} skipped: platform has no background mode", call.action());
        }
    }

    /// Keep the webview running at full speed in background (GPS tracking etc.)
    pub fn disable_web_view_optimizations(&self) {
        self.forward(NativeCall::Webview);
    }

    pub fn disable_battery_optimizations(&self) {
        self.forward(NativeCall::Battery);
    }

    /// Open the manufacturer-specific app-start settings
    pub fn open_app_start_settings(&self, options: AppStartOptions) {
        self.forward(NativeCall::AppStart(options));
    }

    pub fn move_to_background(&self) {
        self.forward(NativeCall::Background);
    }

    pub fn move_to_foreground(&self) {
        self.forward(NativeCall::Foreground);
    }

    pub fn exclude_from_task_list(&self) {
        self.forward(NativeCall::TasklistExclude);
    }

    pub fn include_in_task_list(&self) {
        self.forward(NativeCall::TasklistInclude);
    }

    pub fn wake_up(&self) {
        self.forward(NativeCall::Wakeup);
    }

    /// Wake up and dismiss the keyguard
    pub fn unlock(&self) {
        self.forward(NativeCall::Unlock);
    }

    /// `done` receives whether the screen is off, `None` when unknown
    pub fn is_screen_off<F>(&self, done: F)
    where
        F: FnOnce(Option<bool>) + Send + 'static,
    {
        if !self.is_background_capable() {
            done(None);
            return;
        }

        self.inner.native.exec(
            NativeCall::Dimmed,
            Some(Box::new(move |result| match result {
                Ok(value) => done(value.as_bool()),
                Err(err) => {
                    tracing::warn!("Native dimmed query failed: {}", err);
                    done(None);
                }
            })),
        );
    }

    /// From now on the back button sends the app to background instead of
    /// closing it. Only takes effect on platforms with a background mode.
    pub fn override_back_button(&self) {
        if self.is_background_capable() {
            self.inner
                .back_button_overridden
                .store(true, Ordering::SeqCst);
        }
    }

    pub fn is_back_button_overridden(&self) -> bool {
        self.inner.back_button_overridden.load(Ordering::SeqCst)
    }

    /// Route a back-button press. Returns true when it was consumed.
    pub fn handle_back_button(&self) -> bool {
        if !self.is_back_button_overridden() {
            return false;
        }

        self.move_to_background();
        true
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn on(&self, event: &str, callback: Listener) {
        self.inner.bus.on(event, callback);
    }

    pub fn on_scoped(&self, event: &str, callback: Listener, scope: ListenerScope) {
        self.inner.bus.on_scoped(event, callback, scope);
    }

    pub fn off(&self, event: &str, callback: &Listener) -> bool {
        self.inner.bus.off(event, callback)
    }

    /// Deliver `event` to its listeners. Native code signals `activate`,
    /// `deactivate` and `failure` through here.
    pub fn fire_event(&self, event: &str, args: &[Value]) -> DeliveryReport {
        let name = LifecycleEvent::from(event);
        if name.is_builtin() {
            tracing::debug!("Lifecycle event '{}' ({} args)", name, args.len());
        } else {
            tracing::trace!("Custom event '{}'", name);
        }
        self.inner.bus.fire_event(event, args)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.bus.listener_count(event)
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<ListenerFailure> {
        self.inner.bus.subscribe_failures()
    }
}
