//! `Resource`: the committed/placed/reserved resource entity (§3 "Resource").
//!
//! Wraps a buffer or image allocation, its heap properties, and the
//! lazily-published per-resource [`ViewCache`]. Buffers additionally
//! implement [`VaRange`] so they can be registered in a [`VaMap`] and
//! resolved back from a raw `GetGPUVirtualAddress()` value.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::resource::view::ViewCache;
use crate::va_map::VaRange;
use crate::{Buffer, Image};

/// Mirrors `D3D12_HEAP_TYPE`; drives the Vulkan memory-property mapping in
/// the allocator (§4.3 "Algorithm").
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum HeapType {
    Default,
    Upload,
    Readback,
    GpuUpload,
    Custom,
}

/// Which concrete resource kind backs this entity.
#[derive(Derivative)]
#[derivative(Debug)]
pub enum ResourceKind {
    Buffer(#[derivative(Debug = "ignore")] Buffer),
    Image(#[derivative(Debug = "ignore")] Image),
}

/// Tracks how the resource came to be, since borrowed-handle resources skip
/// destruction of the underlying Vulkan object (§4.3 "Failures").
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Committed,
    Placed,
    Reserved,
    /// Wraps a caller-owned Vulkan handle (e.g. a swapchain image); this
    /// crate never destroys it.
    Borrowed,
}

/// A D3D12 resource translated onto a Vulkan buffer or image (§3 "Resource").
///
/// Ref-counting is split the way the original keeps it: `Arc<Resource>`
/// models the external (application-held) count, while `internal_refs`
/// tracks references held by not-yet-retired command-list submissions.
/// Destruction — dropping the `ResourceKind` and, for buffer resources,
/// removing the entry from the owning [`VaMap`] — only happens once both
/// reach zero, which in practice means once the last `Arc` clone is dropped
/// after `internal_refs` has already settled at zero (submissions always
/// release their reference before the application's last `Arc` can drop,
/// since a submission itself holds a clone).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Resource {
    kind: ResourceKind,
    heap_type: HeapType,
    origin: Origin,
    #[derivative(Debug = "ignore")]
    views: ViewCache,
    internal_refs: AtomicUsize,
}

impl Resource {
    pub fn new_buffer(buffer: Buffer, heap_type: HeapType, origin: Origin) -> Arc<Self> {
        Arc::new(Self {
            kind: ResourceKind::Buffer(buffer),
            heap_type,
            origin,
            views: ViewCache::new(),
            internal_refs: AtomicUsize::new(0),
        })
    }

    pub fn new_image(image: Image, heap_type: HeapType, origin: Origin) -> Arc<Self> {
        Arc::new(Self {
            kind: ResourceKind::Image(image),
            heap_type,
            origin,
            views: ViewCache::new(),
            internal_refs: AtomicUsize::new(0),
        })
    }

    pub fn heap_type(&self) -> HeapType {
        self.heap_type
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match &self.kind {
            ResourceKind::Buffer(b) => Some(b),
            ResourceKind::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.kind {
            ResourceKind::Image(i) => Some(i),
            ResourceKind::Buffer(_) => None,
        }
    }

    /// Called when a command-list submission captures this resource.
    /// Paired with [`Self::release_internal`] when that submission retires.
    pub fn acquire_internal(self: &Arc<Self>) {
        self.internal_refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases a submission-held reference. Does not itself free anything;
    /// actual destruction happens when the last `Arc` is dropped, same as
    /// any other reference-counted value, but a resource with a nonzero
    /// internal count is kept alive by the submission path holding its own
    /// `Arc` clone for the duration.
    pub fn release_internal(self: &Arc<Self>) {
        self.internal_refs.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn internal_ref_count(&self) -> usize {
        self.internal_refs.load(Ordering::Acquire)
    }
}

impl VaRange for Resource {
    fn va(&self) -> u64 {
        match &self.kind {
            ResourceKind::Buffer(b) => b.address(),
            ResourceKind::Image(_) => 0,
        }
    }

    fn size(&self) -> u64 {
        match &self.kind {
            ResourceKind::Buffer(b) => b.size() as u64,
            ResourceKind::Image(_) => 0,
        }
    }
}

/// Maps `{heap_type, cpu_page_property}` to Vulkan memory-property flags
/// (§4.3 "Algorithm"). `upload_hvv` mirrors the `VKD3D_CONFIG=upload_hvv`
/// flag (§6): when set, UPLOAD heaps additionally request `DEVICE_LOCAL`.
pub fn memory_property_flags(heap_type: HeapType, upload_hvv: bool) -> vk::MemoryPropertyFlags {
    match heap_type {
        HeapType::Default => vk::MemoryPropertyFlags::DEVICE_LOCAL,
        HeapType::Upload => {
            let mut flags = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
            if upload_hvv {
                flags |= vk::MemoryPropertyFlags::DEVICE_LOCAL;
            }
            flags
        }
        HeapType::Readback => vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_CACHED,
        HeapType::GpuUpload => vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
        HeapType::Custom => vk::MemoryPropertyFlags::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_hvv_adds_device_local() {
        let plain = memory_property_flags(HeapType::Upload, false);
        let hvv = memory_property_flags(HeapType::Upload, true);
        assert!(!plain.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL));
        assert!(hvv.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL));
    }

    #[test]
    fn readback_is_host_cached() {
        let flags = memory_property_flags(HeapType::Readback, false);
        assert!(flags.contains(vk::MemoryPropertyFlags::HOST_CACHED));
    }
}
