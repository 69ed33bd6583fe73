//! Descriptor heaps and handle encoding (§3 "Descriptor heap", §9 "Bit-exact
//! descriptor encoding").
//!
//! A D3D12 descriptor heap is a flat array of entries of one type. For
//! CBV/SRV/UAV/Sampler heaps the handle the application holds is a virtual
//! address split `{heap_id, index}`; RTV/DSV heaps are CPU-only and may
//! embed a small record directly, so no encoding is needed there.
//!
//! Encoding reserves bit 0 to tag which of the two representations a handle
//! is: a flat pointer (RTV/DSV, `CPU_DESCRIPTOR_HANDLE` to a directly-owned
//! record) or a `{heap_id, index}` pair (CBV/SRV/UAV/Sampler). This matches
//! `vkd3d_desc.h`'s own documented reservation: the encoding is internal to
//! this crate but must be stable within a process (§9).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::resource::view::View;

/// D3D12_DESCRIPTOR_HEAP_TYPE, restricted to the kinds this crate models (§3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HeapType {
    CbvSrvUav,
    Sampler,
    Rtv,
    Dsv,
}

impl HeapType {
    /// RTV/DSV heaps are CPU-only: their entries never need a shader-visible
    /// Vulkan descriptor set binding, only a plain record (§3).
    pub fn is_shader_visible(self) -> bool {
        matches!(self, HeapType::CbvSrvUav | HeapType::Sampler)
    }
}

static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(1);

/// Tag bit distinguishing an encoded `{heap_id, index}` handle from a flat
/// pointer handle (§9). Reserved as bit 0 of the 64-bit handle value.
const HANDLE_TAG_BIT: u64 = 1;

/// Encodes a CBV/SRV/UAV/Sampler descriptor handle as `heap_id << 33 | index
/// << 1 | 1`. The low tag bit distinguishes this from an RTV/DSV flat-record
/// pointer, which is always even (pointers are at least 2-byte aligned).
pub fn encode_handle(heap_id: u32, index: u32) -> u64 {
    ((heap_id as u64) << 33) | ((index as u64) << 1) | HANDLE_TAG_BIT
}

/// Decodes a handle produced by [`encode_handle`]. Returns `None` if the tag
/// bit indicates this is actually a flat-pointer (RTV/DSV) handle.
pub fn decode_handle(handle: u64) -> Option<(u32, u32)> {
    if handle & HANDLE_TAG_BIT == 0 {
        return None;
    }
    let index = ((handle >> 1) & 0xFFFF_FFFF) as u32;
    let heap_id = (handle >> 33) as u32;
    Some((heap_id, index))
}

/// A single slot in a descriptor heap. `None` until the application writes
/// to it (`CreateConstantBufferView` et al.); D3D12 permits reading an unset
/// slot (it returns undefined results, not an error), so this is an `Option`
/// rather than a required-present entry.
#[derive(Debug, Clone, Default)]
struct Slot {
    view: Option<View>,
}

/// A flat array of descriptor entries of a single type (§3 "Descriptor heap").
///
/// Shader-visible heaps (CBV/SRV/UAV/Sampler) hand out handles encoded via
/// [`encode_handle`]; the heap's writer-threaded discipline from §5
/// ("Descriptor heaps are application-threaded") means writes and the
/// command list's read of current bindings are never concurrent, so a
/// plain `RwLock` over the slot array is sufficient -- no need for the
/// lock-free discipline the VA map and view caches require.
#[derive(Debug)]
pub struct DescriptorHeap {
    id: u32,
    kind: HeapType,
    slots: RwLock<Vec<Slot>>,
}

impl DescriptorHeap {
    pub fn new(kind: HeapType, capacity: u32) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            slots: RwLock::new(vec![Slot::default(); capacity as usize]),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> HeapType {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.slots.read().unwrap().len() as u32
    }

    /// The CPU/GPU handle for `index` in this heap. For shader-visible heaps
    /// this is the encoded `{heap_id, index}` form; RTV/DSV heaps hand back
    /// the index itself since those handles are resolved by direct lookup,
    /// not through the global encoding.
    pub fn handle_at(&self, index: u32) -> u64 {
        if self.kind.is_shader_visible() {
            encode_handle(self.id, index)
        } else {
            index as u64
        }
    }

    /// Writes `view` into `index`, matching `CreateConstantBufferView` /
    /// `CreateShaderResourceView` / ... (§4.6's descriptor-table binding
    /// reads these entries when flushing a dirty descriptor table).
    pub fn write(&self, index: u32, view: View) {
        let mut slots = self.slots.write().unwrap();
        if let Some(slot) = slots.get_mut(index as usize) {
            slot.view = Some(view);
        } else {
            log::warn!("descriptor heap write out of bounds: index {index} >= capacity {}", slots.len());
        }
    }

    pub fn read(&self, index: u32) -> Option<View> {
        self.slots.read().unwrap().get(index as usize).and_then(|s| s.view.clone())
    }

    /// Copies `count` contiguous descriptors starting at `src_index` in
    /// `src` to `dst_index` here, as `CopyDescriptors` does.
    pub fn copy_from(&self, dst_index: u32, src: &DescriptorHeap, src_index: u32, count: u32) {
        let src_slots = src.slots.read().unwrap();
        let mut dst_slots = self.slots.write().unwrap();
        for i in 0..count {
            let view = src_slots.get((src_index + i) as usize).and_then(|s| s.view.clone());
            if let Some(slot) = dst_slots.get_mut((dst_index + i) as usize) {
                slot.view = view;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_encoding_round_trips() {
        let encoded = encode_handle(7, 42);
        assert_eq!(decode_handle(encoded), Some((7, 42)));
    }

    #[test]
    fn rtv_heap_handles_are_not_tagged() {
        let heap = DescriptorHeap::new(HeapType::Rtv, 4);
        let handle = heap.handle_at(2);
        assert_eq!(decode_handle(handle), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let heap = DescriptorHeap::new(HeapType::Sampler, 4);
        heap.write(1, View::Sampler(ash::vk::Sampler::null()));
        assert!(heap.read(1).is_some());
        assert!(heap.read(2).is_none());
    }
}
