//! A Win32-`Event`-like primitive backing `SetEventOnCompletion` (§4.9).
//!
//! The fence worker sets one of these exactly once, no earlier than when the
//! GPU (or a host `Signal`) actually reaches the awaited value (§4.9
//! "Contract"). Waiting threads block on a condvar rather than spin, since an
//! application-visible wait can legitimately sit for an entire frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Manual-reset event: once set, stays set until [`HostEvent::reset`] is called.
/// D3D12 events backed by a Win32 `HANDLE` are typically manual-reset when used
/// with `SetEventOnCompletion`, so this mirrors that default.
#[derive(Debug, Default)]
pub struct HostEvent {
    signaled: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl HostEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Sets the event and wakes every thread blocked in [`Self::wait`]. Idempotent.
    pub fn set(&self) {
        self.signaled.store(true, Ordering::Release);
        let _guard = self.lock.lock().unwrap();
        self.condvar.notify_all();
    }

    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    /// Blocks until set, with no timeout.
    pub fn wait(&self) {
        if self.is_set() {
            return;
        }
        let mut guard = self.lock.lock().unwrap();
        while !self.is_set() {
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    /// Blocks until set or `timeout` elapses; returns whether the event was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        let guard = self.lock.lock().unwrap();
        let (_guard, _result) = self
            .condvar
            .wait_timeout_while(guard, timeout, |_| !self.is_set())
            .unwrap();
        self.is_set()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn wait_returns_immediately_once_set() {
        let event = HostEvent::new();
        event.set();
        assert!(event.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn wait_times_out_while_unset() {
        let event = HostEvent::new();
        assert!(!event.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn set_wakes_a_blocked_waiter() {
        let event = Arc::new(HostEvent::new());
        let waiter = event.clone();
        let handle = std::thread::spawn(move || {
            waiter.wait();
        });
        std::thread::sleep(Duration::from_millis(5));
        event.set();
        handle.join().unwrap();
    }
}
