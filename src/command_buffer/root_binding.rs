//! Root-parameter dirty tracking and flush (§4.6 "Per-command contracts",
//! `SetGraphics/ComputeRoot*`).
//!
//! `SetGraphicsRootDescriptorTable`, `SetGraphicsRootConstantBufferView`, and
//! `SetGraphicsRootXxx` only update local binding state; nothing is recorded
//! into the Vulkan command buffer until the next draw or dispatch, at which
//! point [`RootBindingState::flush`] walks the dirty slots and emits exactly
//! the `vkCmdBindDescriptorSets` / `vkCmdPushDescriptorSetKHR` /
//! `vkCmdPushConstants` calls the dirtied parameters require.

use ash::vk;

use crate::root_signature::{RootParameter, RootSignatureLayout};
use crate::Device;

/// What a single root parameter slot currently holds, mirroring the shapes
/// `RootParameter` can take (§3 "Root signature").
#[derive(Debug, Clone)]
enum RootSlotValue {
    /// A bound descriptor table: the heap-allocated `VkDescriptorSet` the
    /// application's `SetDescriptorHeaps` + table offset resolved to.
    DescriptorTable(vk::DescriptorSet),
    /// A root CBV/SRV/UAV: the raw GPU-VA the application passed, resolved
    /// against the VA map at flush time by the caller.
    RootDescriptor {
        gpu_va: u64,
    },
    /// Inline 32-bit root constants, already packed in declaration order.
    Constants(Vec<u32>),
}

#[derive(Debug, Clone)]
struct RootSlot {
    value: Option<RootSlotValue>,
    dirty: bool,
}

impl Default for RootSlot {
    fn default() -> Self {
        Self {
            value: None,
            dirty: false,
        }
    }
}

/// Binding state for one bind point (graphics or compute). D3D12 keeps these
/// independent, so a command list owns one of each (§3).
#[derive(Debug, Default)]
pub struct RootBindingState {
    slots: Vec<RootSlot>,
}

impl RootBindingState {
    pub fn new(parameter_count: usize) -> Self {
        Self {
            slots: vec![RootSlot::default(); parameter_count],
        }
    }

    /// `SetGraphicsRootDescriptorTable` / `SetComputeRootDescriptorTable`.
    pub fn set_descriptor_table(&mut self, root_index: u32, set: vk::DescriptorSet) {
        self.set(root_index, RootSlotValue::DescriptorTable(set));
    }

    /// `SetGraphicsRootConstantBufferView` and the SRV/UAV equivalents; the
    /// distinction between CBV/SRV/UAV only matters for which Vulkan
    /// descriptor type the push-descriptor write below uses, which the
    /// caller supplies by reading `layout.parameters[root_index]`.
    pub fn set_root_descriptor(&mut self, root_index: u32, gpu_va: u64) {
        self.set(
            root_index,
            RootSlotValue::RootDescriptor {
                gpu_va,
            },
        );
    }

    /// `SetGraphicsRoot32BitConstant(s)`.
    pub fn set_constants(&mut self, root_index: u32, values: Vec<u32>) {
        self.set(root_index, RootSlotValue::Constants(values));
    }

    fn set(&mut self, root_index: u32, value: RootSlotValue) {
        let slot = &mut self.slots[root_index as usize];
        slot.value = Some(value);
        slot.dirty = true;
    }

    /// Clears binding state entirely, as `SetGraphicsRootSignature` does when
    /// the active root signature changes (parameter layout is no longer
    /// guaranteed compatible, so nothing survives).
    pub fn reset(&mut self, parameter_count: usize) {
        self.slots = vec![RootSlot::default(); parameter_count];
    }

    /// Emits the Vulkan calls for every dirty slot and clears their dirty
    /// bits. `bind_main_set` is called once with the contiguous run of
    /// dirty table slots that map to the main descriptor set, if any;
    /// `push_descriptor` is called per dirty root CBV/SRV/UAV when push
    /// descriptors are available, otherwise those writes fall back to
    /// `write_into_main_set` (§4.4 step 2's push-descriptor-unavailable path).
    pub fn flush(
        &mut self,
        cmd: vk::CommandBuffer,
        device: &Device,
        layout: &RootSignatureLayout,
        pipeline_layout: vk::PipelineLayout,
        bind_point: vk::PipelineBindPoint,
        push_descriptor_writes: impl Fn(u32, &RootParameter, u64) -> vk::WriteDescriptorSet,
    ) {
        let push_descriptor_available = device.push_descriptor().is_some();
        if !self.slots.iter().any(|s| s.dirty) {
            return;
        }

        let mut push_writes = Vec::new();
        let mut constants_flushes: Vec<(u32, Vec<u32>)> = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.dirty {
                continue;
            }
            let Some(value) = &slot.value else {
                slot.dirty = false;
                continue;
            };
            match value {
                RootSlotValue::DescriptorTable(set) => unsafe {
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        bind_point,
                        pipeline_layout,
                        layout.set_for(crate::root_signature::RootSignatureSet::Main),
                        std::slice::from_ref(set),
                        &[],
                    );
                },
                RootSlotValue::RootDescriptor {
                    gpu_va,
                } => {
                    let param = &layout.parameters[index];
                    if push_descriptor_available {
                        push_writes.push(push_descriptor_writes(index as u32, param, *gpu_va));
                    }
                    // Without push descriptors this falls back to a write
                    // into the main set, which the caller performs before
                    // calling flush (it owns the descriptor-cache handle
                    // this module has no access to).
                }
                RootSlotValue::Constants(values) => {
                    constants_flushes.push((index as u32, values.clone()));
                }
            }
            slot.dirty = false;
        }

        if !push_writes.is_empty() {
            if let Some(khr) = device.push_descriptor() {
                unsafe {
                    khr.cmd_push_descriptor_set(
                        cmd,
                        bind_point,
                        pipeline_layout,
                        layout.set_for(crate::root_signature::RootSignatureSet::Push),
                        &push_writes,
                    );
                }
            }
        }

        for (root_index, values) in constants_flushes {
            let Some(range) = layout.push_constant_ranges.get(root_index as usize) else {
                continue;
            };
            let bytes: &[u8] = bytemuck_cast_u32_slice(&values);
            unsafe {
                device.cmd_push_constants(cmd, pipeline_layout, range.stage_flags, range.offset, bytes);
            }
        }
    }
}

fn bytemuck_cast_u32_slice(values: &[u32]) -> &[u8] {
    // SAFETY: `u32` has no padding and any bit pattern is valid, so
    // reinterpreting as `u8` is sound for the duration of this borrow.
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, values.len() * std::mem::size_of::<u32>()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newly_set_slot_is_dirty_and_clears_after_matching_flush_pass() {
        let mut state = RootBindingState::new(2);
        state.set_constants(0, vec![1, 2, 3]);
        assert!(state.slots[0].dirty);
        // A direct flush call needs a live VkDevice, so this only asserts the
        // state-tracking half; the Vulkan emission half is covered by the
        // integration tests under `tests/`.
    }

    #[test]
    fn reset_drops_all_prior_bindings() {
        let mut state = RootBindingState::new(1);
        state.set_root_descriptor(0, 0x1000);
        state.reset(1);
        assert!(state.slots[0].value.is_none());
        assert!(!state.slots[0].dirty);
    }
}
