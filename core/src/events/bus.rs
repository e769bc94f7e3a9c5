//! In-memory publish/subscribe registry
//!
//! Maps an event name to the ordered list of listeners registered for it.
//! Delivery is synchronous and follows insertion order. Each listener call
//! is isolated: an error or a panic in one listener is logged, reported on
//! the diagnostics channel and does not stop delivery to the others.

use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the listener-failure diagnostics channel
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Receiver object bound to a listener and handed back on every delivery
pub type ListenerScope = Arc<dyn Any + Send + Sync>;

/// Listener callback. Returning an error marks the delivery as failed.
pub type ListenerFn = dyn Fn(&Delivery<'_>) -> anyhow::Result<()> + Send + Sync;

/// Shared listener reference. Removal matches on the identity of this `Arc`.
pub type Listener = Arc<ListenerFn>;

/// Wrap a closure into a [`Listener`]
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&Delivery<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Scope used when a listener is registered without one
#[derive(Debug, Default)]
pub struct GlobalScope;

/// A single event delivery as seen by a listener
pub struct Delivery<'a> {
    pub event: &'a str,
    pub args: &'a [Value],
    scope: &'a ListenerScope,
}

impl<'a> Delivery<'a> {
    /// The receiver bound at registration time
    pub fn scope(&self) -> &(dyn Any + Send + Sync) {
        &**self.scope
    }

    /// Downcast the bound receiver
    pub fn scope_as<T: Any>(&self) -> Option<&T> {
        (**self.scope).downcast_ref::<T>()
    }

    pub fn is_global_scope(&self) -> bool {
        self.scope_as::<GlobalScope>().is_some()
    }

    /// First argument, if any
    pub fn first_arg(&self) -> Option<&Value> {
        self.args.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Listener returned an error
    Error,
    /// Listener panicked
    Panic,
}

/// A listener that failed during delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub event: String,
    /// Position of the listener in the delivery order
    pub position: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single `fire_event` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failures: Vec<ListenerFailure>,
}

impl DeliveryReport {
    /// Number of listeners invoked, failed or not
    pub fn invoked(&self) -> usize {
        self.delivered + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
struct Registration {
    callback: Listener,
    scope: ListenerScope,
}

/// Event name to listener registry
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Registration>>>,
    global_scope: ListenerScope,
    failures: broadcast::Sender<ListenerFailure>,
    isolate_panics: bool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_panic_isolation(true)
    }

    /// With `isolate_panics` off, a panicking listener unwinds through
    /// `fire_event`. Errors returned by listeners are always isolated.
    pub fn with_panic_isolation(isolate_panics: bool) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            listeners: RwLock::new(HashMap::new()),
            global_scope: Arc::new(GlobalScope),
            failures,
            isolate_panics,
        }
    }

    /// Register `callback` for `event` with the global scope
    pub fn on(&self, event: &str, callback: Listener) {
        let scope = Arc::clone(&self.global_scope);
        self.register(event, callback, scope);
    }

    /// Register `callback` for `event`, bound to `scope`
    pub fn on_scoped(&self, event: &str, callback: Listener, scope: ListenerScope) {
        self.register(event, callback, scope);
    }

    fn register(&self, event: &str, callback: Listener, scope: ListenerScope) {
        let mut listeners = self.listeners.write();
        let entries = listeners.entry(event.to_string()).or_default();
        entries.push(Registration { callback, scope });

        tracing::debug!("Listener registered for '{}' ({} total)", event, entries.len());
    }

    /// Remove the first registration of `callback` for `event`.
    ///
    /// Returns true when an entry was removed.
    pub fn off(&self, event: &str, callback: &Listener) -> bool {
        let mut listeners = self.listeners.write();

        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };

        let Some(position) = entries
            .iter()
            .position(|entry| Arc::ptr_eq(&entry.callback, callback))
        else {
            return false;
        };

        entries.remove(position);
        if entries.is_empty() {
            listeners.remove(event);
        }

        tracing::debug!("Listener removed from '{}'", event);
        true
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Receive every listener failure from now on
    pub fn subscribe_failures(&self) -> broadcast::Receiver<ListenerFailure> {
        self.failures.subscribe()
    }

    /// Invoke every listener currently registered for `event`, in order.
    ///
    /// The registry is snapshotted first, so listeners may register, remove
    /// or fire events while being delivered to.
    pub fn fire_event(&self, event: &str, args: &[Value]) -> DeliveryReport {
        let snapshot = match self.listeners.read().get(event) {
            Some(entries) => entries.clone(),
            None => return DeliveryReport::default(),
        };

        tracing::debug!("Firing '{}' to {} listener(s)", event, snapshot.len());

        let mut report = DeliveryReport::default();

        for (position, entry) in snapshot.iter().enumerate() {
            let delivery = Delivery {
                event,
                args,
                scope: &entry.scope,
            };

            let outcome = if self.isolate_panics {
                panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(&delivery)))
            } else {
                Ok((entry.callback)(&delivery))
            };

            let failure = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => ListenerFailure {
                    event: event.to_string(),
                    position,
                    kind: FailureKind::Error,
                    message: format!("{:#}", err),
                },
                Err(payload) => ListenerFailure {
                    event: event.to_string(),
                    position,
                    kind: FailureKind::Panic,
                    message: panic_message(&*payload),
                },
            };

            tracing::warn!(
                event = %failure.event,
                position = failure.position,
                kind = ?failure.kind,
                "Listener failed: {}",
                failure.message
            );

            // No subscribers is fine
            let _ = self.failures.send(failure.clone());
            report.failures.push(failure);
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
