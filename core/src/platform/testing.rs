//! Scriptable native surface for tests and simulations

use super::native::{NativeCall, NativeControlSurface, NativeError, NativeReply, NativeResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// How the surface answers calls that carry a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMode {
    /// Reply with success before `exec` returns
    Succeed,
    /// Reply with this failure before `exec` returns
    Fail(String),
    /// Keep the reply pending until `resolve_next` is called
    Hold,
}

/// Records every call and answers according to its [`ReplyMode`]
pub struct RecordingSurface {
    calls: Mutex<Vec<NativeCall>>,
    pending: Mutex<VecDeque<(NativeCall, NativeReply)>>,
    mode: Mutex<ReplyMode>,
    screen_off: AtomicBool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new(ReplyMode::Succeed)
    }
}

impl RecordingSurface {
    pub fn new(mode: ReplyMode) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            mode: Mutex::new(mode),
            screen_off: AtomicBool::new(false),
        }
    }

    pub fn set_mode(&self, mode: ReplyMode) {
        *self.mode.lock() = mode;
    }

    /// Value reported by `dimmed`
    pub fn set_screen_off(&self, off: bool) {
        self.screen_off.store(off, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().clone()
    }

    /// Action names of every recorded call, in order
    pub fn actions(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(NativeCall::action).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Answer the oldest held call. Returns false when nothing was pending.
    pub fn resolve_next(&self, result: NativeResult) -> bool {
        // Lock released before the reply runs: replies may re-enter `exec`
        let next = self.pending.lock().pop_front();
        match next {
            Some((_, reply)) => {
                reply(result);
                true
            }
            None => false,
        }
    }

    /// Drop every held reply without answering
    pub fn abandon_pending(&self) {
        self.pending.lock().clear();
    }

    fn success_value(&self, call: &NativeCall) -> Value {
        match call {
            NativeCall::Dimmed => Value::Bool(self.screen_off.load(Ordering::SeqCst)),
            _ => Value::Null,
        }
    }
}

impl NativeControlSurface for RecordingSurface {
    fn exec(&self, call: NativeCall, reply: Option<NativeReply>) {
        self.calls.lock().push(call.clone());

        let Some(reply) = reply else {
            return;
        };

        let mode = self.mode.lock().clone();
        match mode {
            ReplyMode::Succeed => reply(Ok(self.success_value(&call))),
            ReplyMode::Fail(message) => reply(Err(NativeError::new(message))),
            ReplyMode::Hold => self.pending.lock().push_back((call, reply)),
        }
    }
}
