//! Descriptor entries: CBV/SRV/UAV/Sampler/RTV/DSV and the
//! acceleration-structure-or-micromap placeholder (§3 "View").
//!
//! Every non-placeholder view references exactly one resource. SRV/UAV
//! carry a dual buffer/image representation because D3D12 treats a
//! descriptor range as polymorphic over buffer and image (§3, §4.4); a view
//! published from a descriptor-heap write picks whichever representation
//! the backing resource actually is and leaves the other `None`.

use std::collections::HashMap;
use std::sync::Mutex;

use ash::vk;

use crate::core::atomic::PublishOnce;
use crate::{Image, ImageView};

/// Discriminates the kind of descriptor a [`View`] represents (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ViewKind {
    Cbv,
    Srv,
    Uav,
    Sampler,
    Rtv,
    Dsv,
    /// RTAS/OMM placeholder (§3, §4.2): D3D12 exposes acceleration structures
    /// and opacity micromaps through the same VA-indexed placement call.
    AccelerationStructureOrOpacityMicromap,
}

/// A UAV's optional hidden counter, backed by a structured-buffer append/consume
/// counter the original keeps alongside the main UAV descriptor.
#[derive(Debug, Clone, Copy)]
pub struct UavCounter {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub view: vk::BufferView,
}

/// The dual buffer/image representation backing an SRV or UAV (§3 "View").
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferOrImageView {
    pub buffer_view: Option<vk::BufferView>,
    pub image_view: Option<vk::ImageView>,
}

/// One descriptor entry in a resource's view cache, or heap slot (§3 "View").
#[derive(Debug, Clone)]
pub enum View {
    /// CBVs hold a buffer+offset+size triple; no Vulkan handle is needed (§3).
    Cbv {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    },
    Srv {
        format: vk::Format,
        repr: BufferOrImageView,
    },
    Uav {
        format: vk::Format,
        repr: BufferOrImageView,
        counter: Option<UavCounter>,
    },
    Sampler(vk::Sampler),
    Rtv {
        image_view: vk::ImageView,
        format: vk::Format,
    },
    Dsv {
        image_view: vk::ImageView,
        format: vk::Format,
    },
    /// Placeholder kind for RTAS/OMM placement (§4.2). `opacity_micromap` is
    /// `Some` only once `place_micromap` has placed one at the same key;
    /// D3D12 allows only one of the two to be live for a given VA, but a
    /// conflicting placement is a logged error, not a rejection (§4.2, §9).
    AccelerationStructureOrOpacityMicromap {
        acceleration_structure: Option<vk::AccelerationStructureKHR>,
        opacity_micromap: Option<vk::MicromapEXT>,
    },
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::Cbv {
                ..
            } => ViewKind::Cbv,
            View::Srv {
                ..
            } => ViewKind::Srv,
            View::Uav {
                ..
            } => ViewKind::Uav,
            View::Sampler(_) => ViewKind::Sampler,
            View::Rtv {
                ..
            } => ViewKind::Rtv,
            View::Dsv {
                ..
            } => ViewKind::Dsv,
            View::AccelerationStructureOrOpacityMicromap {
                ..
            } => ViewKind::AccelerationStructureOrOpacityMicromap,
        }
    }
}

/// Key a view is published/looked-up under inside a resource's view cache
/// (§3 "View cache (per-resource)"). Dynamic root descriptors key on
/// `(offset, size)`; descriptor-heap writes key on the full tuple below;
/// the RTAS/OMM placeholder uses `ViewKey::Placement`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ViewKey {
    BufferRange {
        offset: u64,
        size: u64,
    },
    ImageSubresource {
        format_bits: u32,
        base_mip: u32,
        mip_count: u32,
        base_layer: u32,
        layer_count: u32,
    },
    Placement,
}

/// A resource's lazily-published view cache (§3 "View cache (per-resource)",
/// §5 "View-cache publication is CAS-once").
///
/// The cache itself is published once via [`PublishOnce`] (so concurrent
/// first-time accesses race to create the `Mutex<HashMap<..>>` and the loser
/// discards its draft), and individual keys are then inserted under that
/// mutex. This matches `vkd3d_view_map`'s two-phase publication: the map
/// object first, then entries within it.
#[derive(Debug, Default)]
pub struct ViewCache {
    inner: PublishOnce<Mutex<HashMap<ViewKey, View>>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached view for `key`, creating it with `make` on first
    /// use. `make` may be called more than once if two threads race to
    /// populate the same key (the map does not yet de-dupe within a single
    /// key the way [`PublishOnce`] de-dupes the cache itself); the last
    /// writer under the lock wins and earlier drafts are simply dropped.
    pub fn get_or_create(&self, key: ViewKey, make: impl FnOnce() -> View) -> View {
        let map = self.inner.get_or_publish(|| Box::new(Mutex::new(HashMap::new())));
        let mut guard = map.lock().unwrap();
        guard.entry(key).or_insert_with(make).clone()
    }

    pub fn get(&self, key: ViewKey) -> Option<View> {
        self.inner.get().and_then(|map| map.lock().unwrap().get(&key).cloned())
    }

    /// Places an RTAS at `Placement`, logging (not rejecting) a conflict with
    /// a previously placed OMM (§4.2, §9 "Open questions").
    pub fn place_acceleration_structure(&self, as_handle: vk::AccelerationStructureKHR) {
        let map = self.inner.get_or_publish(|| Box::new(Mutex::new(HashMap::new())));
        let mut guard = map.lock().unwrap();
        match guard.get_mut(&ViewKey::Placement) {
            Some(View::AccelerationStructureOrOpacityMicromap {
                acceleration_structure,
                opacity_micromap,
            }) => {
                if opacity_micromap.is_some() {
                    log::warn!(
                        "place_acceleration_structure: overwriting an opacity micromap previously placed at this VA"
                    );
                }
                *acceleration_structure = Some(as_handle);
            }
            _ => {
                guard.insert(
                    ViewKey::Placement,
                    View::AccelerationStructureOrOpacityMicromap {
                        acceleration_structure: Some(as_handle),
                        opacity_micromap: None,
                    },
                );
            }
        }
    }

    /// Places an OMM at `Placement`, logging (not rejecting) a conflict with
    /// a previously placed RTAS (§4.2, §9).
    pub fn place_micromap(&self, omm: vk::MicromapEXT) {
        let map = self.inner.get_or_publish(|| Box::new(Mutex::new(HashMap::new())));
        let mut guard = map.lock().unwrap();
        match guard.get_mut(&ViewKey::Placement) {
            Some(View::AccelerationStructureOrOpacityMicromap {
                acceleration_structure,
                opacity_micromap,
            }) => {
                if acceleration_structure.is_some() {
                    log::warn!(
                        "place_micromap: overwriting an acceleration structure previously placed at this VA"
                    );
                }
                *opacity_micromap = Some(omm);
            }
            _ => {
                guard.insert(
                    ViewKey::Placement,
                    View::AccelerationStructureOrOpacityMicromap {
                        acceleration_structure: None,
                        opacity_micromap: Some(omm),
                    },
                );
            }
        }
    }

    /// Reads back whatever has been placed at this VA (§4.2 `read_rtas`).
    pub fn read_rtas(&self) -> (Option<vk::AccelerationStructureKHR>, Option<vk::MicromapEXT>) {
        match self.get(ViewKey::Placement) {
            Some(View::AccelerationStructureOrOpacityMicromap {
                acceleration_structure,
                opacity_micromap,
            }) => (acceleration_structure, opacity_micromap),
            _ => (None, None),
        }
    }
}

/// Builds the dual representation for an SRV/UAV from whichever of buffer or
/// image view is actually applicable, matching §3's "dual buffer/image
/// representation" invariant: exactly one side is populated for any given
/// concrete resource, never both.
pub fn buffer_repr(view: vk::BufferView) -> BufferOrImageView {
    BufferOrImageView {
        buffer_view: Some(view),
        image_view: None,
    }
}

pub fn image_repr(view: &ImageView) -> BufferOrImageView {
    BufferOrImageView {
        buffer_view: None,
        image_view: Some(unsafe { view.handle() }),
    }
}

#[allow(dead_code)]
fn assert_image_kind(_: &Image) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_cache_publishes_once_per_key() {
        let cache = ViewCache::new();
        let a = cache.get_or_create(ViewKey::Placement, || View::Sampler(vk::Sampler::null()));
        let b = cache.get(ViewKey::Placement).unwrap();
        assert_eq!(a.kind(), b.kind());
    }

    #[test]
    fn rtas_then_omm_placement_logs_but_does_not_reject() {
        let cache = ViewCache::new();
        cache.place_acceleration_structure(vk::AccelerationStructureKHR::null());
        cache.place_micromap(vk::MicromapEXT::null());
        let (as_handle, omm) = cache.read_rtas();
        assert!(as_handle.is_some());
        assert!(omm.is_some());
    }
}
