// Integration test for the full background-mode lifecycle
//
// Drives the controller the way a host does: platform ready, listeners,
// application ready, enable, native activate/deactivate, configure, disable.

use bgmode_core::platform::testing::{RecordingSurface, ReplyMode};
use bgmode_core::{
    listener, BackgroundMode, BridgeConfig, NativeCall, NativeControlSurface, NativeError,
    NotificationSettings, PlatformCapability,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

fn record_events(mode: &BackgroundMode, events: &[&str]) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in events {
        let log = Arc::clone(&log);
        mode.on(
            event,
            listener(move |delivery| {
                log.lock().push(delivery.event.to_string());
                Ok(())
            }),
        );
    }
    log
}

fn android_mode(surface: &Arc<RecordingSurface>) -> BackgroundMode {
    let mode = BackgroundMode::new(Arc::clone(surface) as Arc<dyn NativeControlSurface>);
    mode.initialize_for_platform("Android").unwrap();
    mode
}

#[test]
fn test_full_android_lifecycle() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    let log = record_events(&mode, &["enable", "disable", "activate", "deactivate"]);

    mode.application_ready();
    assert!(log.lock().is_empty(), "Nothing to replay on a fresh start");

    mode.enable(|result| assert!(result.is_ok()));
    assert!(mode.is_enabled());

    // Native side reports the app went to background
    mode.fire_event("activate", &[]);
    assert!(mode.is_active());
    assert_eq!(mode.get_settings(), NotificationSettings::builtin_defaults());

    mode.configure(NotificationSettings {
        text: Some("Syncing 3 files".to_string()),
        ..Default::default()
    });
    assert_eq!(
        mode.get_settings().text.as_deref(),
        Some("Syncing 3 files")
    );

    mode.fire_event("deactivate", &[]);
    assert!(!mode.is_active());
    assert!(mode.get_settings().is_empty());

    mode.disable(|result| assert!(result.is_ok()));
    assert!(!mode.is_enabled());

    assert_eq!(
        *log.lock(),
        vec!["enable", "activate", "deactivate", "disable"]
    );
    assert_eq!(surface.actions(), vec!["enable", "configure", "disable"]);
}

#[test]
fn test_configure_scenario_run_title() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    mode.fire_event("activate", &[]);

    mode.configure(NotificationSettings {
        title: Some("Run".to_string()),
        ..Default::default()
    });

    let settings = mode.get_settings();
    assert_eq!(settings.title.as_deref(), Some("Run"));
    assert_eq!(settings.resume, Some(true));
    assert_eq!(settings.big_text, Some(false));
    assert!(settings.text.is_none());
}

#[test]
fn test_configure_keeps_earlier_runtime_values() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    mode.fire_event("activate", &[]);

    mode.configure(NotificationSettings {
        title: Some("Uploading".to_string()),
        ..Default::default()
    });
    mode.configure(NotificationSettings {
        text: Some("42%".to_string()),
        ..Default::default()
    });

    let settings = mode.get_settings();
    assert_eq!(settings.title.as_deref(), Some("Uploading"));
    assert_eq!(settings.text.as_deref(), Some("42%"));

    // Reactivation starts over from the defaults
    mode.fire_event("deactivate", &[]);
    mode.fire_event("activate", &[]);
    assert!(mode.get_settings().title.is_none());
}

#[test]
fn test_application_ready_replays_in_order() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    mode.enable(|_| {});
    mode.fire_event("activate", &[]);

    let log = record_events(&mode, &["activate", "enable"]);
    mode.application_ready();

    assert_eq!(*log.lock(), vec!["enable", "activate"]);
}

#[test]
fn test_application_ready_enabled_but_inactive() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    mode.enable(|_| {});

    let log = record_events(&mode, &["enable", "activate", "disable", "deactivate"]);
    mode.application_ready();

    assert_eq!(*log.lock(), vec!["enable"]);
}

#[test]
fn test_browser_is_always_active() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = BackgroundMode::new(Arc::clone(&surface) as Arc<dyn NativeControlSurface>);
    mode.initialize_for_platform("browser").unwrap();
    let log = record_events(&mode, &["enable", "activate"]);

    mode.application_ready();
    assert_eq!(*log.lock(), vec!["activate"]);

    // No background mode: configure and forwards stay local
    mode.configure(NotificationSettings {
        title: Some("ignored".to_string()),
        ..Default::default()
    });
    mode.set_defaults(&NotificationSettings {
        title: Some("Browser".to_string()),
        ..Default::default()
    });
    mode.move_to_background();

    assert_eq!(mode.get_defaults().title.as_deref(), Some("Browser"));
    assert_eq!(surface.call_count(), 0);
}

#[test]
fn test_enable_on_unsupported_platform_still_asks_native() {
    let surface = Arc::new(RecordingSurface::new(ReplyMode::Fail(
        "Invalid action: enable".to_string(),
    )));
    let mode = BackgroundMode::new(Arc::clone(&surface) as Arc<dyn NativeControlSurface>);
    assert_eq!(
        mode.initialize_for_platform("iOS").unwrap(),
        PlatformCapability::Unsupported
    );

    let error = Arc::new(Mutex::new(None));
    let e = Arc::clone(&error);
    mode.enable(move |result| *e.lock() = result.err());

    assert_eq!(
        error.lock().clone().map(|e| e.message),
        Some("Invalid action: enable".to_string())
    );
    assert!(!mode.is_enabled());
}

#[test]
fn test_failure_event_carries_message() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);
    let messages = Arc::new(Mutex::new(Vec::new()));

    let m = Arc::clone(&messages);
    mode.on(
        "failure",
        listener(move |delivery| {
            if let Some(Value::String(message)) = delivery.first_arg() {
                m.lock().push(message.clone());
            }
            Ok(())
        }),
    );

    mode.fire_event("failure", &[Value::from("'startForegroundService not allowed'")]);

    assert_eq!(
        *messages.lock(),
        vec!["'startForegroundService not allowed'".to_string()]
    );
    assert!(!mode.is_active());
}

#[test]
fn test_config_defaults_reach_native_on_set_defaults() {
    let config = BridgeConfig::from_json_str(
        r##"{"platform":"android","defaults":{"title":"Tracking","color":"#00AA00"}}"##,
    )
    .unwrap();
    let surface = Arc::new(RecordingSurface::default());
    let mode = BackgroundMode::with_config(
        Arc::clone(&surface) as Arc<dyn NativeControlSurface>,
        &config,
    );
    mode.initialize(config.platform_capability().unwrap()).unwrap();

    mode.set_defaults(&NotificationSettings {
        icon: Some("ic_sync".to_string()),
        ..Default::default()
    });

    match surface.calls().as_slice() {
        [NativeCall::Configure {
            settings,
            live_update: false,
        }] => {
            assert_eq!(settings.title.as_deref(), Some("Tracking"));
            assert_eq!(settings.color.as_deref(), Some("#00AA00"));
            assert_eq!(settings.icon.as_deref(), Some("ic_sync"));
            assert_eq!(settings.resume, Some(true));
        }
        other => panic!("unexpected native calls: {:?}", other),
    }
}

#[tokio::test]
async fn test_async_enable_and_disable() {
    let surface = Arc::new(RecordingSurface::default());
    let mode = android_mode(&surface);

    mode.set_enabled_async(true).await.unwrap();
    assert!(mode.is_enabled());

    mode.set_enabled_async(false).await.unwrap();
    assert!(!mode.is_enabled());

    assert!(mode.request_permissions_async().await.is_ok());
}

#[tokio::test]
async fn test_async_enable_reports_native_failure() {
    let surface = Arc::new(RecordingSurface::new(ReplyMode::Fail(
        "Notification permission denied".to_string(),
    )));
    let mode = android_mode(&surface);

    let err = mode.enable_async().await.unwrap_err();
    assert_eq!(err, NativeError::new("Notification permission denied"));
}

#[tokio::test]
async fn test_dropped_reply_resolves_to_error() {
    let surface = Arc::new(RecordingSurface::new(ReplyMode::Hold));
    let mode = android_mode(&surface);

    let pending = {
        let mode = mode.clone();
        tokio::spawn(async move { mode.enable_async().await })
    };

    // Wait until the call reached the surface, then abandon it
    while surface.pending_count() == 0 {
        tokio::task::yield_now().await;
    }
    surface.abandon_pending();

    let result = pending.await.unwrap();
    assert!(result.is_err());
    assert!(!mode.is_enabled());
}

#[tokio::test]
async fn test_async_screen_state() {
    let surface = Arc::new(RecordingSurface::default());
    surface.set_screen_off(true);
    let mode = android_mode(&surface);

    assert_eq!(mode.is_screen_off_async().await, Some(true));

    surface.set_mode(ReplyMode::Fail("No activity".to_string()));
    assert_eq!(mode.is_screen_off_async().await, None);
}
