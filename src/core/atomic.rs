//! Lock-free primitives used throughout the translation layer (§4.1).
//!
//! All shared mutable state outside of this module goes through either the
//! spinlock or the reader-writer lock defined here, never a bare
//! `UnsafeCell`. This mirrors `vkd3d_atomic.h`/`vkd3d_spinlock.h` in the
//! original: explicit memory orders everywhere, a relaxed-load-then-acquire-CAS
//! spinlock, and a monotonic clock for timeouts.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub use std::sync::atomic::Ordering as MemoryOrder;

/// A single-writer spin-lock for hot paths where the critical section is a
/// handful of instructions (e.g. publishing a VA-map tree node). Acquiring
/// tries a relaxed load first so spinning readers don't hammer the
/// cache-coherency fabric with exchange traffic while the lock is held.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

/// RAII guard for [`SpinLock`]; unlocks with a release store on drop.
pub struct SpinLockGuard<'a> {
    lock: &'a SpinLock,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Attempt to acquire the lock without spinning. Mirrors
    /// `vkd3d_spinlock_try_lock`: a relaxed peek to avoid issuing an exchange
    /// when the lock is obviously held, followed by an acquire exchange.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_>> {
        if self.locked.load(Ordering::Relaxed) {
            return None;
        }
        if self.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(SpinLockGuard {
                lock: self,
            })
        }
    }

    /// Spin until the lock is acquired, yielding the hardware hint each
    /// iteration (`_mm_pause` on the original; `std::hint::spin_loop` here).
    pub fn lock(&self) -> SpinLockGuard<'_> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            std::hint::spin_loop();
        }
    }
}

impl Drop for SpinLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// A writer-preferring reader-writer lock. Readers that arrive while a writer
/// is waiting block behind it, so a steady stream of lookups (VA-map `deref`,
/// PSO-cache hits) cannot starve a rare writer (VA-map `insert`/`remove`,
/// PSO-cache eviction).
#[derive(Debug)]
pub struct RwSpinLock {
    state: AtomicU32,
}

const WRITER_BIT: u32 = 1 << 31;
const WRITER_WAITING_BIT: u32 = 1 << 30;

impl RwSpinLock {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
        }
    }

    pub fn read(&self) -> RwSpinLockReadGuard<'_> {
        loop {
            let current = self.state.load(Ordering::Relaxed);
            if current & (WRITER_BIT | WRITER_WAITING_BIT) != 0 {
                std::hint::spin_loop();
                continue;
            }
            if self
                .state
                .compare_exchange_weak(current, current + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return RwSpinLockReadGuard {
                    lock: self,
                };
            }
        }
    }

    pub fn write(&self) -> RwSpinLockWriteGuard<'_> {
        self.state.fetch_or(WRITER_WAITING_BIT, Ordering::Relaxed);
        loop {
            if self
                .state
                .compare_exchange_weak(WRITER_WAITING_BIT, WRITER_BIT, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return RwSpinLockWriteGuard {
                    lock: self,
                };
            }
            std::hint::spin_loop();
        }
    }
}

pub struct RwSpinLockReadGuard<'a> {
    lock: &'a RwSpinLock,
}

impl Drop for RwSpinLockReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

pub struct RwSpinLockWriteGuard<'a> {
    lock: &'a RwSpinLock,
}

impl Drop for RwSpinLockWriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.state.store(0, Ordering::Release);
    }
}

/// A CAS-once latch for lazily publishing a value shared across threads,
/// e.g. a resource's view cache (§3) or a VA-tree node (§4.2). The first
/// thread to win the CAS installs its value with release ordering; every
/// other thread (including the loser of the race) observes it with acquire
/// ordering and drops its own draft.
pub struct PublishOnce<T> {
    ptr: std::sync::atomic::AtomicPtr<T>,
}

impl<T> Default for PublishOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PublishOnce<T> {
    pub const fn new() -> Self {
        Self {
            ptr: std::sync::atomic::AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Returns the published value, publishing `make()`'s result if nothing
    /// has been published yet. If two threads race, the loser's draft is
    /// dropped and the winner's value is returned to both.
    pub fn get_or_publish(&self, make: impl FnOnce() -> Box<T>) -> &T {
        let existing = self.ptr.load(Ordering::Acquire);
        if !existing.is_null() {
            return unsafe { &*existing };
        }
        let draft = Box::into_raw(make());
        match self.ptr.compare_exchange(
            std::ptr::null_mut(),
            draft,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            Ok(_) => unsafe { &*draft },
            Err(winner) => {
                // Another thread published first; drop our draft and use theirs.
                unsafe {
                    drop(Box::from_raw(draft));
                }
                unsafe { &*winner }
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        let ptr = self.ptr.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { &*ptr })
        }
    }
}

impl<T> Drop for PublishOnce<T> {
    fn drop(&mut self) {
        let ptr = *self.ptr.get_mut();
        if !ptr.is_null() {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}

/// A 64-bit monotonic counter with explicit acquire/release increment, used
/// by the fence worker and submission thread to hand out internal timeline
/// values without a lock.
#[derive(Debug, Default)]
pub struct MonotonicCounter {
    value: AtomicU64,
}

impl MonotonicCounter {
    pub const fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

/// Returns a monotonic timestamp in nanoseconds, for use with timeout waits
/// on the submission thread and fence worker.
pub fn monotonic_now() -> Instant {
    Instant::now()
}

/// Condition variable wrapped with a monotonic timeout loop, used by the
/// submission thread's mailbox and the fence worker's idle wait. Host waits
/// never busy-spin; they block on the condvar and are woken either by a new
/// submission or by the periodic timeout so pending Vulkan waits can be
/// re-polled.
#[derive(Debug, Default)]
pub struct TimedWaker {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl TimedWaker {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) {
        let guard = self.mutex.lock().unwrap();
        let _ = self.condvar.wait_timeout(guard, timeout);
    }

    pub fn wake_all(&self) {
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn spinlock_excludes_concurrent_writers() {
        let lock = Arc::new(SpinLock::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = vec![];
        for _ in 0..8 {
            let lock = lock.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let _guard = lock.lock();
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn publish_once_is_idempotent() {
        let cell: PublishOnce<u64> = PublishOnce::new();
        let a = *cell.get_or_publish(|| Box::new(41));
        let b = *cell.get_or_publish(|| Box::new(99));
        assert_eq!(a, 41);
        assert_eq!(b, 41);
    }

    #[test]
    fn monotonic_counter_strictly_increases() {
        let counter = MonotonicCounter::new(0);
        let a = counter.next();
        let b = counter.next();
        assert!(b > a);
    }
}
