// Mobile bridge types for UniFFI bindings
//
// Exposes the background-mode controller to Android/iOS code. Native code
// implements `NativeHost` (a Cordova-style exec entry point) and answers
// calls through the `NativeReplyHandle` it receives.

use crate::config::BridgeConfig;
use crate::events::{listener, Listener};
use crate::lifecycle::BackgroundMode;
use crate::platform::{
    AppStartOptions, NativeCall, NativeControlSurface, NativeError, NativeReply, PlatformCapability,
};
use crate::settings::{NotificationContent, NotificationSettings};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum BridgeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

// ============================================================================
// FOREIGN CALLBACK INTERFACES
// ============================================================================

/// Implemented by platform code. `args_json` is a JSON array of positional
/// arguments. `reply` is present when the core expects an answer.
#[uniffi::export(with_foreign)]
pub trait NativeHost: Send + Sync {
    fn exec(
        &self,
        service: String,
        action: String,
        args_json: String,
        reply: Option<Arc<NativeReplyHandle>>,
    );
}

/// Receives events registered through `BackgroundModeHandle::observe`
#[uniffi::export(with_foreign)]
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: String, args_json: String);
}

/// Completion of enable/disable/permission requests. `error` is `None` on success.
#[uniffi::export(with_foreign)]
pub trait CompletionObserver: Send + Sync {
    fn on_complete(&self, error: Option<String>);
}

/// Answer to a screen-state query. `None` when the platform cannot tell.
#[uniffi::export(with_foreign)]
pub trait ScreenStateObserver: Send + Sync {
    fn on_screen_state(&self, screen_off: Option<bool>);
}

// ============================================================================
// REPLY HANDLE
// ============================================================================

/// One-shot answer to a native call. Extra answers are ignored.
#[derive(uniffi::Object)]
pub struct NativeReplyHandle {
    reply: Mutex<Option<NativeReply>>,
}

impl NativeReplyHandle {
    fn new(reply: NativeReply) -> Self {
        Self {
            reply: Mutex::new(Some(reply)),
        }
    }

    fn send(&self, result: Result<Value, NativeError>) {
        let reply = self.reply.lock().take();
        match reply {
            Some(reply) => reply(result),
            None => tracing::warn!("Native reply answered more than once; ignoring"),
        }
    }
}

#[uniffi::export]
impl NativeReplyHandle {
    /// Answer with success. `value_json` carries a result value (e.g. the
    /// boolean of a `dimmed` query).
    pub fn success(&self, value_json: Option<String>) {
        let value = value_json
            .as_deref()
            .map(|json| serde_json::from_str(json).unwrap_or(Value::Null))
            .unwrap_or(Value::Null);
        self.send(Ok(value));
    }

    pub fn error(&self, message: String) {
        self.send(Err(NativeError::from(message)));
    }

    pub fn is_answered(&self) -> bool {
        self.reply.lock().is_none()
    }
}

/// Adapts a foreign `NativeHost` to the core surface
struct ForeignSurface {
    host: Arc<dyn NativeHost>,
}

impl NativeControlSurface for ForeignSurface {
    fn exec(&self, call: NativeCall, reply: Option<NativeReply>) {
        let args_json = serde_json::to_string(&call.args()).unwrap_or_else(|_| "[]".to_string());
        let handle = reply.map(|reply| Arc::new(NativeReplyHandle::new(reply)));

        tracing::debug!("exec {}.{} {}", call.service().as_str(), call.action(), args_json);
        self.host.exec(
            call.service().as_str().to_string(),
            call.action().to_string(),
            args_json,
            handle,
        );
    }
}

fn parse_args(args_json: &str) -> Result<Vec<Value>, BridgeError> {
    if args_json.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str(args_json) {
        Ok(Value::Array(args)) => Ok(args),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(single) => Ok(vec![single]),
        Err(e) => Err(BridgeError::InvalidJson(e.to_string())),
    }
}

fn completion(
    observer: Option<Arc<dyn CompletionObserver>>,
) -> impl FnOnce(Result<(), NativeError>) + Send + 'static {
    move |result| {
        if let Some(observer) = observer {
            observer.on_complete(result.err().map(|e| e.message));
        }
    }
}

/// Notification text, icon and color after fallbacks, for native renderers
#[uniffi::export]
pub fn resolve_notification_content(settings: NotificationSettings) -> NotificationContent {
    NotificationContent::resolve(&settings)
}

// ============================================================================
// CONTROLLER HANDLE
// ============================================================================

struct ObserverEntry {
    token: u64,
    event: String,
    listener: Listener,
}

#[derive(uniffi::Object)]
pub struct BackgroundModeHandle {
    mode: BackgroundMode,
    observers: Mutex<Vec<ObserverEntry>>,
    next_token: AtomicU64,
}

impl BackgroundModeHandle {
    fn from_mode(mode: BackgroundMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            observers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        })
    }

    /// Rust-side access to the wrapped controller
    pub fn controller(&self) -> &BackgroundMode {
        &self.mode
    }
}

#[uniffi::export]
impl BackgroundModeHandle {
    #[uniffi::constructor]
    pub fn new(host: Arc<dyn NativeHost>) -> Arc<Self> {
        Self::from_mode(BackgroundMode::new(Arc::new(ForeignSurface { host })))
    }

    #[uniffi::constructor]
    pub fn with_config_json(
        host: Arc<dyn NativeHost>,
        config_json: String,
    ) -> Result<Arc<Self>, BridgeError> {
        let config = BridgeConfig::from_json_str(&config_json)
            .map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
        Ok(Self::from_mode(BackgroundMode::with_config(
            Arc::new(ForeignSurface { host }),
            &config,
        )))
    }

    /// Platform-readiness signal
    pub fn platform_ready(&self, platform: String) -> Result<PlatformCapability, BridgeError> {
        self.mode
            .initialize_for_platform(&platform)
            .map_err(|e| BridgeError::Lifecycle(e.to_string()))
    }

    /// Application-readiness signal
    pub fn application_ready(&self) {
        self.mode.application_ready();
    }

    pub fn is_background_capable(&self) -> bool {
        self.mode.is_background_capable()
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    pub fn is_active(&self) -> bool {
        self.mode.is_active()
    }

    pub fn get_defaults(&self) -> NotificationSettings {
        self.mode.get_defaults()
    }

    pub fn set_defaults(&self, overrides: NotificationSettings) {
        self.mode.set_defaults(&overrides);
    }

    pub fn get_settings(&self) -> NotificationSettings {
        self.mode.get_settings()
    }

    pub fn configure(&self, options: NotificationSettings) {
        self.mode.configure(options);
    }

    pub fn enable(&self, observer: Option<Arc<dyn CompletionObserver>>) {
        self.mode.enable(completion(observer));
    }

    pub fn disable(&self, observer: Option<Arc<dyn CompletionObserver>>) {
        self.mode.disable(completion(observer));
    }

    pub fn set_enabled(&self, enabled: bool, observer: Option<Arc<dyn CompletionObserver>>) {
        self.mode.set_enabled(enabled, completion(observer));
    }

    pub fn request_permissions(&self, observer: Option<Arc<dyn CompletionObserver>>) {
        self.mode.request_permissions(completion(observer));
    }

    /// Native code reports `activate`, `deactivate` or `failure` here.
    /// Returns the number of listeners that failed.
    pub fn fire_event(&self, event: String, args_json: String) -> Result<u32, BridgeError> {
        let args = parse_args(&args_json)?;
        let report = self.mode.fire_event(&event, &args);
        Ok(report.failures.len() as u32)
    }

    /// Register an observer; the returned token removes it again
    pub fn observe(&self, event: String, observer: Arc<dyn EventObserver>) -> u64 {
        let callback = listener(move |delivery| {
            let args_json = serde_json::to_string(delivery.args)?;
            observer.on_event(delivery.event.to_string(), args_json);
            Ok(())
        });

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.mode.on(&event, Arc::clone(&callback));
        self.observers.lock().push(ObserverEntry {
            token,
            event,
            listener: callback,
        });
        token
    }

    pub fn unobserve(&self, token: u64) -> bool {
        let entry = {
            let mut observers = self.observers.lock();
            observers
                .iter()
                .position(|entry| entry.token == token)
                .map(|position| observers.remove(position))
        };

        match entry {
            Some(entry) => self.mode.off(&entry.event, &entry.listener),
            None => false,
        }
    }

    pub fn disable_web_view_optimizations(&self) {
        self.mode.disable_web_view_optimizations();
    }

    pub fn disable_battery_optimizations(&self) {
        self.mode.disable_battery_optimizations();
    }

    /// `options_json`: `true`, `false` or `{"title": ..., "text": ...}`
    pub fn open_app_start_settings(&self, options_json: Option<String>) -> Result<(), BridgeError> {
        let options: AppStartOptions = match options_json.as_deref() {
            Some(json) => {
                serde_json::from_str(json).map_err(|e| BridgeError::InvalidJson(e.to_string()))?
            }
            None => AppStartOptions::default(),
        };
        self.mode.open_app_start_settings(options);
        Ok(())
    }

    pub fn move_to_background(&self) {
        self.mode.move_to_background();
    }

    pub fn move_to_foreground(&self) {
        self.mode.move_to_foreground();
    }

    pub fn exclude_from_task_list(&self) {
        self.mode.exclude_from_task_list();
    }

    pub fn include_in_task_list(&self) {
        self.mode.include_in_task_list();
    }

    pub fn wake_up(&self) {
        self.mode.wake_up();
    }

    pub fn unlock(&self) {
        self.mode.unlock();
    }

    /// Ask native code whether the display is off
    pub fn is_screen_off(&self, observer: Arc<dyn ScreenStateObserver>) {
        self.mode
            .is_screen_off(move |screen_off| observer.on_screen_state(screen_off));
    }

    pub fn override_back_button(&self) {
        self.mode.override_back_button();
    }

    pub fn handle_back_button(&self) -> bool {
        self.mode.handle_back_button()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every call immediately and remembers what it saw
    #[derive(Default)]
    struct EchoHost {
        seen: Mutex<Vec<(String, String, String)>>,
        fail_with: Option<String>,
        answer: Option<String>,
    }

    impl NativeHost for EchoHost {
        fn exec(
            &self,
            service: String,
            action: String,
            args_json: String,
            reply: Option<Arc<NativeReplyHandle>>,
        ) {
            self.seen.lock().push((service, action, args_json));
            if let Some(reply) = reply {
                match &self.fail_with {
                    Some(message) => reply.error(message.clone()),
                    None => reply.success(self.answer.clone()),
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<(String, String)>>,
        completions: Mutex<Vec<Option<String>>>,
        screen: Mutex<Vec<Option<bool>>>,
    }

    impl ScreenStateObserver for RecordingObserver {
        fn on_screen_state(&self, screen_off: Option<bool>) {
            self.screen.lock().push(screen_off);
        }
    }

    impl EventObserver for RecordingObserver {
        fn on_event(&self, event: String, args_json: String) {
            self.events.lock().push((event, args_json));
        }
    }

    impl CompletionObserver for RecordingObserver {
        fn on_complete(&self, error: Option<String>) {
            self.completions.lock().push(error);
        }
    }

    #[test]
    fn test_exec_wire_format() {
        let host = Arc::new(EchoHost::default());
        let handle = BackgroundModeHandle::new(Arc::clone(&host) as Arc<dyn NativeHost>);
        handle.platform_ready("Android".to_string()).unwrap();

        handle.set_defaults(NotificationSettings {
            title: Some("Sync".to_string()),
            ..Default::default()
        });
        handle.exclude_from_task_list();

        let seen = host.seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "BackgroundMode");
        assert_eq!(seen[0].1, "configure");
        assert_eq!(
            seen[0].2,
            // serde_json maps keep keys sorted
            r#"[{"bigText":false,"resume":true,"title":"Sync"},false]"#
        );
        assert_eq!(
            seen[1],
            (
                "BackgroundModeExt".to_string(),
                "tasklistExclude".to_string(),
                "[]".to_string()
            )
        );
    }

    #[test]
    fn test_set_enabled_reports_completion_and_event() {
        let host = Arc::new(EchoHost::default());
        let handle = BackgroundModeHandle::new(host);
        handle.platform_ready("android".to_string()).unwrap();

        let observer = Arc::new(RecordingObserver::default());
        handle.observe("enable".to_string(), Arc::clone(&observer) as Arc<dyn EventObserver>);
        handle.set_enabled(true, Some(Arc::clone(&observer) as Arc<dyn CompletionObserver>));

        assert!(handle.is_enabled());
        assert_eq!(*observer.completions.lock(), vec![None]);
        assert_eq!(
            *observer.events.lock(),
            vec![("enable".to_string(), "[]".to_string())]
        );
    }

    #[test]
    fn test_enable_and_disable_complete() {
        let host = Arc::new(EchoHost::default());
        let handle = BackgroundModeHandle::new(Arc::clone(&host) as Arc<dyn NativeHost>);
        handle.platform_ready("android".to_string()).unwrap();
        assert!(handle.is_background_capable());

        let observer = Arc::new(RecordingObserver::default());
        handle.enable(Some(Arc::clone(&observer) as Arc<dyn CompletionObserver>));
        assert!(handle.is_enabled());
        handle.disable(Some(Arc::clone(&observer) as Arc<dyn CompletionObserver>));
        assert!(!handle.is_enabled());

        // No observer is fine too
        handle.enable(None);
        assert!(handle.is_enabled());

        assert_eq!(*observer.completions.lock(), vec![None, None]);
        let actions: Vec<String> = host.seen.lock().iter().map(|(_, a, _)| a.clone()).collect();
        assert_eq!(actions, vec!["enable", "disable", "enable"]);
    }

    #[test]
    fn test_is_background_capable_follows_platform() {
        let ios = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        ios.platform_ready("iOS".to_string()).unwrap();
        assert!(!ios.is_background_capable());

        let browser = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        browser.platform_ready("browser".to_string()).unwrap();
        assert!(!browser.is_background_capable());
        assert!(browser.is_active());
    }

    #[test]
    fn test_is_screen_off_delivers_native_answer() {
        let host = Arc::new(EchoHost {
            answer: Some("true".to_string()),
            ..Default::default()
        });
        let handle = BackgroundModeHandle::new(Arc::clone(&host) as Arc<dyn NativeHost>);
        handle.platform_ready("android".to_string()).unwrap();

        let observer = Arc::new(RecordingObserver::default());
        handle.is_screen_off(Arc::clone(&observer) as Arc<dyn ScreenStateObserver>);

        assert_eq!(*observer.screen.lock(), vec![Some(true)]);
        assert_eq!(host.seen.lock().last().map(|(_, a, _)| a.as_str()), Some("dimmed"));

        // Platforms without a background mode cannot tell
        let browser = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        browser.platform_ready("browser".to_string()).unwrap();
        browser.is_screen_off(Arc::clone(&observer) as Arc<dyn ScreenStateObserver>);
        assert_eq!(*observer.screen.lock(), vec![Some(true), None]);
    }

    #[test]
    fn test_native_error_reaches_observer() {
        let host = Arc::new(EchoHost {
            fail_with: Some("Notification permission denied".to_string()),
            ..Default::default()
        });
        let handle = BackgroundModeHandle::new(host);
        handle.platform_ready("android".to_string()).unwrap();

        let observer = Arc::new(RecordingObserver::default());
        handle.request_permissions(Some(Arc::clone(&observer) as Arc<dyn CompletionObserver>));

        assert_eq!(
            *observer.completions.lock(),
            vec![Some("Notification permission denied".to_string())]
        );
    }

    #[test]
    fn test_observe_and_unobserve() {
        let handle = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        handle.platform_ready("android".to_string()).unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let token = handle.observe(
            "failure".to_string(),
            Arc::clone(&observer) as Arc<dyn EventObserver>,
        );

        handle
            .fire_event("failure".to_string(), r#"["'boom'"]"#.to_string())
            .unwrap();
        assert!(handle.unobserve(token));
        assert!(!handle.unobserve(token));
        handle.fire_event("failure".to_string(), String::new()).unwrap();

        assert_eq!(
            *observer.events.lock(),
            vec![("failure".to_string(), r#"["'boom'"]"#.to_string())]
        );
    }

    #[test]
    fn test_fire_event_rejects_bad_json() {
        let handle = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        let result = handle.fire_event("activate".to_string(), "{not json".to_string());
        assert!(matches!(result, Err(BridgeError::InvalidJson(_))));
    }

    #[test]
    fn test_resolve_notification_content_for_native() {
        let handle = BackgroundModeHandle::new(Arc::new(EchoHost::default()));
        handle.set_defaults(NotificationSettings {
            title: Some("Tracking".to_string()),
            color: Some("00AA00".to_string()),
            ..Default::default()
        });

        let content = resolve_notification_content(handle.get_defaults());
        assert_eq!(content.title, "Tracking");
        assert_eq!(content.color_argb, Some(0xFF00_AA00));
        assert!(content.reopen_on_tap);
        assert!(!content.big_text_style);
    }

    #[test]
    fn test_reply_handle_answers_once() {
        let answers = Arc::new(Mutex::new(Vec::new()));
        let a = Arc::clone(&answers);
        let handle = NativeReplyHandle::new(Box::new(move |result| a.lock().push(result)));

        assert!(!handle.is_answered());
        handle.success(Some("true".to_string()));
        handle.error("late".to_string());

        assert!(handle.is_answered());
        assert_eq!(*answers.lock(), vec![Ok(Value::Bool(true))]);
    }

    #[test]
    fn test_with_config_json() {
        let handle = BackgroundModeHandle::with_config_json(
            Arc::new(EchoHost::default()),
            r#"{"defaults":{"text":"Working"}}"#.to_string(),
        )
        .unwrap();
        assert_eq!(handle.get_defaults().text.as_deref(), Some("Working"));

        let configured = BackgroundModeHandle::with_config_json(
            Arc::new(EchoHost::default()),
            r#"{"platform":"android"}"#.to_string(),
        )
        .unwrap();
        assert_eq!(
            configured.platform_ready(String::new()).unwrap(),
            PlatformCapability::BackgroundCapable
        );
        assert!(configured.is_background_capable());

        let bad = BackgroundModeHandle::with_config_json(
            Arc::new(EchoHost::default()),
            r#"{"log_filter":""}"#.to_string(),
        );
        assert!(matches!(bad, Err(BridgeError::InvalidConfig(_))));
    }
}
