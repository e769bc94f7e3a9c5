// bgmode-wasm — WebAssembly bindings for the hosted web app

pub mod back_button;
pub mod native_surface;

use crate::back_button::BackButtonHook;
use crate::native_surface::{error_message, from_js, to_js, JsHandle, JsNativeSurface};
use bgmode_core::{
    listener, AppStartOptions, BackgroundMode as CoreBackgroundMode, BridgeConfig, Listener,
    NotificationSettings,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    // Already installed by an earlier instance
    let _ = tracing_wasm::try_set_as_global_default();
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// A JS callback registered through `on`, kept so `off` can find it by identity
struct JsListener {
    event: String,
    function: js_sys::Function,
    listener: Listener,
}

/// Wrap a JS function into a core listener invoked with `this = scope`
fn js_listener(function: js_sys::Function, scope: JsValue) -> Listener {
    let handle = JsHandle((function, scope));
    listener(move |delivery| {
        let (function, scope) = &handle.0;
        let args: js_sys::Array = delivery.args.iter().map(to_js).collect();
        function
            .apply(scope, &args)
            .map(|_| ())
            .map_err(|thrown| anyhow::anyhow!(error_message(&thrown)))
    })
}

fn parse_settings(value: JsValue) -> Result<NotificationSettings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(NotificationSettings::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

#[wasm_bindgen]
pub struct BackgroundMode {
    inner: CoreBackgroundMode,
    js_listeners: Mutex<Vec<JsListener>>,
    back_button: Mutex<Option<BackButtonHook>>,
}

impl BackgroundMode {
    fn from_core(inner: CoreBackgroundMode) -> Self {
        Self {
            inner,
            js_listeners: Mutex::new(Vec::new()),
            back_button: Mutex::new(None),
        }
    }
}

#[wasm_bindgen]
impl BackgroundMode {
    /// `exec` has the shape `exec(success, error, service, action, args)`
    #[wasm_bindgen(constructor)]
    pub fn new(exec: js_sys::Function) -> Self {
        init_logging();
        Self::from_core(CoreBackgroundMode::new(Arc::new(JsNativeSurface::new(exec))))
    }

    /// Same as the constructor, with a bridge config object
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(exec: js_sys::Function, config: JsValue) -> Result<BackgroundMode, JsValue> {
        init_logging();
        let config: BridgeConfig = serde_wasm_bindgen::from_value(config).map_err(js_error)?;
        config.validate().map_err(js_error)?;
        Ok(Self::from_core(CoreBackgroundMode::with_config(
            Arc::new(JsNativeSurface::new(exec)),
            &config,
        )))
    }

    /// Platform-readiness signal (`deviceready`). Returns the capability name.
    /// Without a platform name the one from `withConfig` is used.
    #[wasm_bindgen(js_name = platformReady)]
    pub fn platform_ready(&self, platform: Option<String>) -> Result<String, JsValue> {
        self.inner
            .initialize_for_platform(platform.as_deref().unwrap_or_default())
            .map(|capability| capability.to_string())
            .map_err(js_error)
    }

    /// Application-readiness signal
    #[wasm_bindgen(js_name = applicationReady)]
    pub fn application_ready(&self) {
        self.inner.application_ready();
    }

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    #[wasm_bindgen(js_name = getDefaults)]
    pub fn get_defaults(&self) -> JsValue {
        to_js(&self.inner.get_defaults())
    }

    #[wasm_bindgen(js_name = setDefaults)]
    pub fn set_defaults(&self, overrides: JsValue) -> Result<(), JsValue> {
        let overrides = parse_settings(overrides)?;
        self.inner.set_defaults(&overrides);
        Ok(())
    }

    #[wasm_bindgen(js_name = getSettings)]
    pub fn get_settings(&self) -> JsValue {
        to_js(&self.inner.get_settings())
    }

    pub fn configure(&self, options: JsValue) -> Result<(), JsValue> {
        let options = parse_settings(options)?;
        self.inner.configure(options);
        Ok(())
    }

    pub fn enable(&self) -> js_sys::Promise {
        self.set_enabled(true)
    }

    pub fn disable(&self) -> js_sys::Promise {
        self.set_enabled(false)
    }

    /// Resolves once native code confirmed the change
    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, enabled: bool) -> js_sys::Promise {
        let mode = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            mode.set_enabled_async(enabled)
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = requestPermissions)]
    pub fn request_permissions(&self) -> js_sys::Promise {
        let mode = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            mode.request_permissions_async()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(js_error)
        })
    }

    /// Resolves with a boolean, or `undefined` when the platform cannot tell
    #[wasm_bindgen(js_name = isScreenOff)]
    pub fn is_screen_off(&self) -> js_sys::Promise {
        let mode = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            Ok(match mode.is_screen_off_async().await {
                Some(off) => JsValue::from_bool(off),
                None => JsValue::UNDEFINED,
            })
        })
    }

    /// Register `callback` for `event`. Non-function callbacks are ignored.
    /// `scope` becomes `this` inside the callback, the global object if omitted.
    pub fn on(&self, event: String, callback: JsValue, scope: JsValue) {
        let Ok(function) = callback.dyn_into::<js_sys::Function>() else {
            tracing::debug!("Ignoring non-function listener for '{}'", event);
            return;
        };

        let scope = if scope.is_undefined() || scope.is_null() {
            js_sys::global().into()
        } else {
            scope
        };

        let registered = js_listener(function.clone(), scope);
        self.inner.on(&event, Arc::clone(&registered));
        self.js_listeners.lock().push(JsListener {
            event,
            function,
            listener: registered,
        });
    }

    /// Remove the first registration of `callback` for `event`
    pub fn off(&self, event: String, callback: JsValue) -> bool {
        let entry = {
            let mut listeners = self.js_listeners.lock();
            listeners
                .iter()
                .position(|entry| {
                    entry.event == event && js_sys::Object::is(entry.function.as_ref(), &callback)
                })
                .map(|position| listeners.remove(position))
        };

        match entry {
            Some(entry) => self.inner.off(&entry.event, &entry.listener),
            None => false,
        }
    }

    /// Deliver `event` with `args`. Returns the number of failed listeners.
    #[wasm_bindgen(js_name = fireEvent)]
    pub fn fire_event(&self, event: String, args: Option<js_sys::Array>) -> u32 {
        let args: Vec<Value> = args
            .map(|args| args.iter().map(from_js).collect())
            .unwrap_or_default();
        self.inner.fire_event(&event, &args).failures.len() as u32
    }

    #[wasm_bindgen(js_name = disableWebViewOptimizations)]
    pub fn disable_web_view_optimizations(&self) {
        self.inner.disable_web_view_optimizations();
    }

    #[wasm_bindgen(js_name = disableBatteryOptimizations)]
    pub fn disable_battery_optimizations(&self) {
        self.inner.disable_battery_optimizations();
    }

    /// `options`: `true`, `false` or `{ title, text }`; defaults to `true`
    #[wasm_bindgen(js_name = openAppStartSettings)]
    pub fn open_app_start_settings(&self, options: JsValue) -> Result<(), JsValue> {
        let options: AppStartOptions = if options.is_undefined() || options.is_null() {
            AppStartOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(js_error)?
        };
        self.inner.open_app_start_settings(options);
        Ok(())
    }

    #[wasm_bindgen(js_name = moveToBackground)]
    pub fn move_to_background(&self) {
        self.inner.move_to_background();
    }

    #[wasm_bindgen(js_name = moveToForeground)]
    pub fn move_to_foreground(&self) {
        self.inner.move_to_foreground();
    }

    #[wasm_bindgen(js_name = excludeFromTaskList)]
    pub fn exclude_from_task_list(&self) {
        self.inner.exclude_from_task_list();
    }

    #[wasm_bindgen(js_name = includeInTaskList)]
    pub fn include_in_task_list(&self) {
        self.inner.include_in_task_list();
    }

    #[wasm_bindgen(js_name = wakeUp)]
    pub fn wake_up(&self) {
        self.inner.wake_up();
    }

    pub fn unlock(&self) {
        self.inner.unlock();
    }

    /// Send the app to background on `backbutton` instead of closing it
    #[wasm_bindgen(js_name = overrideBackButton)]
    pub fn override_back_button(&self) {
        self.inner.override_back_button();
        if !self.inner.is_back_button_overridden() {
            return;
        }

        let mut hook = self.back_button.lock();
        if hook.is_some() {
            return;
        }

        let mode = self.inner.clone();
        *hook = BackButtonHook::install(move |event: web_sys::Event| {
            if mode.handle_back_button() {
                event.prevent_default();
            }
        });
    }
}
