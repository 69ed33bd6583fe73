//! Timeline `VkSemaphore` wrapper (§3 "Fence", §4.8, §4.9).
//!
//! D3D12 fences are monotonic counters with no reset, which is exactly what
//! `VK_KHR_timeline_semaphore` (core since Vulkan 1.2) models. A CPU-side
//! `Signal` call is expressed as a host signal on the same semaphore, so a
//! [`D3D12Fence`](crate::sync::d3d12_fence::D3D12Fence) never needs a separate
//! CPU-only fallback object; the timeline semaphore is the single source of
//! truth for both GPU- and host-reached values.

use ash::vk;

use crate::Device;

/// A `VkSemaphore` created with `VK_SEMAPHORE_TYPE_TIMELINE`.
#[derive(Debug)]
pub struct TimelineSemaphore {
    device: Device,
    handle: vk::Semaphore,
}

impl TimelineSemaphore {
    pub fn new(device: Device, initial_value: u64) -> Result<Self, vk::Result> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let info = vk::SemaphoreCreateInfo::builder().push_next(&mut type_info);
        let handle = unsafe { device.create_semaphore(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new timeline VkSemaphore {handle:p} (initial value {initial_value})");
        Ok(Self {
            device,
            handle,
        })
    }

    /// Signals the timeline from the host, the Vulkan-level primitive a CPU
    /// `ID3D12Fence::Signal` maps onto directly (§4.8 step 4).
    pub fn signal(&self, value: u64) -> Result<(), vk::Result> {
        let info = vk::SemaphoreSignalInfo::builder().semaphore(self.handle).value(value);
        unsafe { self.device.signal_semaphore(&info) }
    }

    /// Blocks the calling thread until the timeline reaches `value` or `timeout_ns`
    /// elapses. Returns `Ok(true)` if the value was reached, `Ok(false)` on timeout.
    pub fn wait(&self, value: u64, timeout_ns: u64) -> Result<bool, vk::Result> {
        let semaphores = [self.handle];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::builder().semaphores(&semaphores).values(&values);
        match unsafe { self.device.wait_semaphores(&info, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn counter_value(&self) -> Result<u64, vk::Result> {
        unsafe { self.device.get_semaphore_counter_value(self.handle) }
    }

    /// # Safety
    /// Any vulkan calls that mutate the semaphore's state may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying timeline VkSemaphore {:p}", self.handle);
        unsafe {
            self.device.destroy_semaphore(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    // A real semaphore needs a live VkDevice, so coverage for wait/signal
    // round trips lives in the integration tests under `tests/`. This module
    // only holds unit tests that do not require a device.
}
