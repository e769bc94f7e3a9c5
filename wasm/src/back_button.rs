// Back-button hook
//
// Cordova dispatches a `backbutton` event on the document. The hook keeps
// its closure alive while registered and unregisters it on drop instead of
// leaking it with .forget().

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event};

pub struct BackButtonHook {
    document: Document,
    callback: Closure<dyn FnMut(Event)>,
}

impl BackButtonHook {
    /// Attach `handler` to the document's `backbutton` event. Returns `None`
    /// outside a browser document.
    pub fn install<F>(handler: F) -> Option<Self>
    where
        F: FnMut(Event) + 'static,
    {
        let document = web_sys::window()?.document()?;
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);

        if let Err(e) = document
            .add_event_listener_with_callback("backbutton", callback.as_ref().unchecked_ref())
        {
            tracing::warn!("Failed to register backbutton listener: {:?}", e);
            return None;
        }

        Some(Self { document, callback })
    }
}

impl Drop for BackButtonHook {
    fn drop(&mut self) {
        let _ = self.document.remove_event_listener_with_callback(
            "backbutton",
            self.callback.as_ref().unchecked_ref(),
        );
    }
}
