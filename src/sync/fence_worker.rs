//! The per-device fence worker (§4.9).
//!
//! A single background thread owns every outstanding `{fence, value, event}`
//! waiter registered via [`FenceWorker::register_event`]. Each iteration it
//! batches a `vkWaitSemaphores` call across the distinct timeline semaphores
//! currently in play, at the minimum value each one still needs to reach,
//! then walks the waiter list completing anything now satisfied. Using
//! `VK_SEMAPHORE_WAIT_ANY_BIT` lets the call return as soon as any single
//! semaphore advances rather than blocking for the slowest one, so waiters on
//! a fast queue are not held up behind a slow one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use ash::vk;

use crate::core::device::DeviceRemovedReason;
use crate::sync::d3d12_fence::D3D12Fence;
use crate::sync::host_event::HostEvent;
use crate::Device;

/// How long a single `vkWaitSemaphores` call blocks before the worker
/// re-checks for newly registered waiters. Not a correctness requirement
/// (the condvar wakes it immediately on registration) -- this just bounds
/// staleness if a notify is ever missed.
const WAIT_BATCH_TIMEOUT_NS: u64 = 50_000_000;

struct FenceWaiter {
    fence: Arc<D3D12Fence>,
    value: u64,
    event: Arc<HostEvent>,
}

struct State {
    device: Device,
    waiters: Mutex<Vec<FenceWaiter>>,
    wake: Condvar,
    running: AtomicBool,
}

/// Owns the background thread; dropping it joins the thread after asking it
/// to exit (§5 "Cancellation / timeouts").
pub struct FenceWorker {
    state: Arc<State>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FenceWorker {
    pub fn new(device: Device) -> Self {
        let state = Arc::new(State {
            device,
            waiters: Mutex::new(Vec::new()),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let worker_state = state.clone();
        let handle = std::thread::Builder::new()
            .name("d3d12vk-fence-worker".into())
            .spawn(move || Self::run(worker_state))
            .expect("failed to spawn fence worker thread");
        Self {
            state,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Registers a `SetEventOnCompletion`-style waiter. Callable from any
    /// thread (§4.9 "Contract"); the worker guarantees `event` is set exactly
    /// once, no earlier than the GPU (or a host `Signal`) reaching `value`.
    pub fn register_event(&self, fence: Arc<D3D12Fence>, value: u64, event: Arc<HostEvent>) {
        let mut waiters = self.state.waiters.lock().unwrap();
        waiters.push(FenceWaiter {
            fence,
            value,
            event,
        });
        self.state.wake.notify_all();
    }

    fn run(state: Arc<State>) {
        while state.running.load(Ordering::Acquire) {
            let mut waiters = state.waiters.lock().unwrap();
            if waiters.is_empty() {
                let (guard, _timeout) = state
                    .wake
                    .wait_timeout(waiters, Duration::from_millis(50))
                    .unwrap();
                waiters = guard;
                if waiters.is_empty() {
                    continue;
                }
            }

            // Collapse to the minimum outstanding value per distinct semaphore.
            let mut handles: Vec<vk::Semaphore> = Vec::new();
            let mut values: Vec<u64> = Vec::new();
            for w in waiters.iter() {
                let handle = unsafe { w.fence.timeline().handle() };
                match handles.iter().position(|h| *h == handle) {
                    Some(idx) => values[idx] = values[idx].min(w.value),
                    None => {
                        handles.push(handle);
                        values.push(w.value);
                    }
                }
            }
            drop(waiters);

            if !handles.is_empty() {
                let info = vk::SemaphoreWaitInfo::builder()
                    .flags(vk::SemaphoreWaitFlags::ANY)
                    .semaphores(&handles)
                    .values(&values);
                match unsafe { state.device.wait_semaphores(&info, WAIT_BATCH_TIMEOUT_NS) } {
                    Ok(()) | Err(vk::Result::TIMEOUT) => {}
                    Err(vk::Result::ERROR_DEVICE_LOST) => {
                        state.device.report_device_removed(DeviceRemovedReason::Unknown);
                    }
                    Err(e) => {
                        log::warn!("fence worker: vkWaitSemaphores failed: {e}");
                    }
                }
            }

            let device_removed = state.device.ensure_not_removed().is_err();
            let mut waiters = state.waiters.lock().unwrap();
            waiters.retain(|w| {
                let reached = device_removed || w.fence.get_completed_value() >= w.value;
                if reached {
                    w.event.set();
                }
                !reached
            });
        }
    }
}

impl Drop for FenceWorker {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
        self.state.wake.notify_all();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    // Exercising the worker end-to-end needs a live VkDevice and timeline
    // semaphores; covered by the integration tests under `tests/`.
}
