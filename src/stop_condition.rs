use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Cancellation token shared between the session and its pacing loop.
#[derive(Clone, Default)]
pub(crate) struct StopCondition {
    condition: Arc<(Mutex<bool>, Condvar)>,
}

impl StopCondition {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_should_stop(&self) {
        let (lock, cvar) = &*self.condition;
        let mut should_stop = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *should_stop = true;
        cvar.notify_all();
    }

    pub(crate) fn get_should_stop(&self) -> bool {
        let (lock, _) = &*self.condition;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `timeout` unless stopped earlier. Returns whether a stop was requested.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.condition;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (should_stop, _) = cvar
            .wait_timeout_while(guard, timeout, |should_stop| !*should_stop)
            .unwrap_or_else(PoisonError::into_inner);
        *should_stop
    }
}
