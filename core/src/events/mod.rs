//! Event notification layer
//!
//! Listener registry and the lifecycle event names that travel through it.

pub mod bus;
pub mod types;

pub use bus::{
    listener, Delivery, DeliveryReport, EventBus, FailureKind, GlobalScope, Listener,
    ListenerFailure, ListenerFn, ListenerScope,
};
pub use types::LifecycleEvent;
