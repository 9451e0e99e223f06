use std::sync::{Condvar, Mutex, MutexGuard};

use crate::EventChannel;

#[derive(Debug, Default)]
struct EventState {
    pending: bool,
    notifications: u64,
    raised: u64,
}

/// Event channel backed by a mutex + condvar.
///
/// `wait` consumes a pending signal. Both directions set the pending flag, so a front end that
/// notifies the back end also wakes its own waiter for one more pass over the rings; the rings are
/// level-triggered, so an extra pass is harmless.
#[derive(Debug, Default)]
pub struct CondvarEventChannel {
    state: Mutex<EventState>,
    cond: Condvar,
}

impl CondvarEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EventState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Back-end side of the channel: signal the front end.
    pub fn raise(&self) {
        let mut state = self.lock();
        state.raised += 1;
        state.pending = true;
        self.cond.notify_all();
    }

    /// Number of front end → back end notifications so far.
    pub fn notifications(&self) -> u64 {
        self.lock().notifications
    }

    /// Number of back end → front end signals so far.
    pub fn raised(&self) -> u64 {
        self.lock().raised
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }
}

impl EventChannel for CondvarEventChannel {
    fn wait(&self) {
        let mut state = self.lock();
        while !state.pending {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        state.pending = false;
    }

    fn notify(&self) {
        let mut state = self.lock();
        state.notifications += 1;
        state.pending = true;
        self.cond.notify_all();
    }
}
