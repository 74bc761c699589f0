use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A one-shot countdown latch used to let `submit()` callers block until a
/// shutdown-style update (`CloseConnections`, `StopSelector`, `DumpKeys`) has
/// been applied on the loop thread.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    done: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    pub(crate) fn new() -> Latch {
        Latch {
            done: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn count_down(&self) {
        *self.done.lock().unwrap() = true;
        self.cv.notify_all();
    }

    /// Waits for `count_down` up to `timeout`, returning whether it fired in
    /// time.
    pub(crate) fn await_for(&self, timeout: Duration) -> bool {
        let guard = self.done.lock().unwrap();
        if *guard {
            return true;
        }
        let (guard, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |done| !*done)
            .unwrap();
        *guard
    }
}
