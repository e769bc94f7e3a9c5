//! Native control surface backed by a JavaScript `exec` function
//!
//! The function has the Cordova shape:
//! `exec(success, error, service, action, args)`.

use bgmode_core::{NativeCall, NativeControlSurface, NativeError, NativeReply};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Owned JS value that the core may hold behind `Send + Sync` bounds.
pub(crate) struct JsHandle<T>(pub(crate) T);

// SAFETY: wasm32-unknown-unknown without the atomics target feature runs on a
// single thread. The wrapped JS handle is never observed from another thread.
unsafe impl<T> Send for JsHandle<T> {}
unsafe impl<T> Sync for JsHandle<T> {}

/// Serialize to plain JS objects instead of `Map`s
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

pub(crate) fn from_js(value: JsValue) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

pub(crate) fn error_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

pub struct JsNativeSurface {
    exec: JsHandle<js_sys::Function>,
}

impl JsNativeSurface {
    pub fn new(exec: js_sys::Function) -> Self {
        Self {
            exec: JsHandle(exec),
        }
    }
}

impl NativeControlSurface for JsNativeSurface {
    fn exec(&self, call: NativeCall, reply: Option<NativeReply>) {
        // Only one of the two callbacks ever runs
        let slot = reply.map(|reply| Rc::new(RefCell::new(Some(reply))));

        let (success, error) = match &slot {
            Some(slot) => {
                let on_success = Rc::clone(slot);
                let on_error = Rc::clone(slot);

                let success = Closure::once_into_js(move |value: JsValue| {
                    let reply = on_success.borrow_mut().take();
                    if let Some(reply) = reply {
                        reply(Ok(from_js(value)));
                    }
                });
                let error = Closure::once_into_js(move |value: JsValue| {
                    let reply = on_error.borrow_mut().take();
                    if let Some(reply) = reply {
                        reply(Err(NativeError::new(error_message(&value))));
                    }
                });
                (success, error)
            }
            None => (JsValue::UNDEFINED, JsValue::UNDEFINED),
        };

        let args = js_sys::Array::of5(
            &success,
            &error,
            &JsValue::from_str(call.service().as_str()),
            &JsValue::from_str(call.action()),
            &to_js(&call.args()),
        );

        if let Err(thrown) = self.exec.0.apply(&JsValue::NULL, &args) {
            let message = error_message(&thrown);
            tracing::error!("exec {} threw: {}", call.action(), message);

            let pending = match &slot {
                Some(slot) => slot.borrow_mut().take(),
                None => None,
            };
            if let Some(reply) = pending {
                reply(Err(NativeError::new(message)));
            }
        }
    }
}
