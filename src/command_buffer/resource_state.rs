//! `ResourceBarrier` translation and per-resource state tracking (§4.6
//! "Per-command contracts", "ResourceBarrier").
//!
//! D3D12 resource states are translated to Vulkan pipeline-stage/access
//! masks and, for images, layouts. A command list tracks each resource's
//! state locally so that repeated barriers within the same list coalesce
//! correctly and so that implicit state promotion/decay (D3D12's "simplified
//! barriers" for buffers and non-simultaneous-access textures) can be
//! reconciled once the list is submitted.

use ash::vk;

/// Mirrors the subset of `D3D12_RESOURCE_STATES` this crate translates. Bits
/// match the real enum's bit positions so a caller can pass the raw value
/// straight through without a lookup table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct ResourceStates(u32);

impl ResourceStates {
    pub const COMMON: Self = Self(0);
    pub const VERTEX_AND_CONSTANT_BUFFER: Self = Self(0x1);
    pub const INDEX_BUFFER: Self = Self(0x2);
    pub const RENDER_TARGET: Self = Self(0x4);
    pub const UNORDERED_ACCESS: Self = Self(0x8);
    pub const DEPTH_WRITE: Self = Self(0x10);
    pub const DEPTH_READ: Self = Self(0x20);
    pub const NON_PIXEL_SHADER_RESOURCE: Self = Self(0x40);
    pub const PIXEL_SHADER_RESOURCE: Self = Self(0x80);
    pub const STREAM_OUT: Self = Self(0x100);
    pub const INDIRECT_ARGUMENT: Self = Self(0x200);
    pub const COPY_DEST: Self = Self(0x400);
    pub const COPY_SOURCE: Self = Self(0x800);
    pub const RESOLVE_DEST: Self = Self(0x1000);
    pub const RESOLVE_SOURCE: Self = Self(0x2000);
    pub const PRESENT: Self = Self(0);
    pub const GENERIC_READ: Self = Self(
        Self::VERTEX_AND_CONSTANT_BUFFER.0
            | Self::INDEX_BUFFER.0
            | Self::NON_PIXEL_SHADER_RESOURCE.0
            | Self::PIXEL_SHADER_RESOURCE.0
            | Self::INDIRECT_ARGUMENT.0
            | Self::COPY_SOURCE.0,
    );

    pub fn contains(self, other: Self) -> bool {
        other.0 == 0 || self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl std::ops::BitOr for ResourceStates {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Whether a resource participates in image-layout transitions. Buffers have
/// no layout, only stage/access transitions (§4.6).
pub enum BarrierTarget {
    Buffer,
    Image {
        aspect_mask: vk::ImageAspectFlags,
    },
}

/// The Vulkan-side translation of a `{before, after}` `D3D12_RESOURCE_STATES`
/// pair: stage and access masks for both sides of the barrier, plus an image
/// layout transition when the target is an image.
pub struct TranslatedBarrier {
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
}

/// Per-state stage/access/layout, looked up once per side of a barrier.
fn state_mapping(state: ResourceStates) -> (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout) {
    if state == ResourceStates::COMMON {
        return (
            vk::PipelineStageFlags2::ALL_COMMANDS,
            vk::AccessFlags2::empty(),
            vk::ImageLayout::GENERAL,
        );
    }
    let mut stage = vk::PipelineStageFlags2::empty();
    let mut access = vk::AccessFlags2::empty();
    let mut layout = vk::ImageLayout::GENERAL;

    if state.contains(ResourceStates::VERTEX_AND_CONSTANT_BUFFER) {
        stage |= vk::PipelineStageFlags2::VERTEX_INPUT | vk::PipelineStageFlags2::VERTEX_SHADER;
        access |= vk::AccessFlags2::UNIFORM_READ | vk::AccessFlags2::VERTEX_ATTRIBUTE_READ;
    }
    if state.contains(ResourceStates::INDEX_BUFFER) {
        stage |= vk::PipelineStageFlags2::INDEX_INPUT;
        access |= vk::AccessFlags2::INDEX_READ;
    }
    if state.contains(ResourceStates::RENDER_TARGET) {
        stage |= vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
        access |= vk::AccessFlags2::COLOR_ATTACHMENT_WRITE;
        layout = vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL;
    }
    if state.contains(ResourceStates::UNORDERED_ACCESS) {
        stage |= vk::PipelineStageFlags2::ALL_COMMANDS;
        access |= vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE;
        layout = vk::ImageLayout::GENERAL;
    }
    if state.contains(ResourceStates::DEPTH_WRITE) {
        stage |= vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS;
        access |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE;
        layout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;
    }
    if state.contains(ResourceStates::DEPTH_READ) {
        stage |= vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS;
        access |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ;
        layout = vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL;
    }
    if state.contains(ResourceStates::NON_PIXEL_SHADER_RESOURCE) {
        stage |= vk::PipelineStageFlags2::COMPUTE_SHADER
            | vk::PipelineStageFlags2::VERTEX_SHADER
            | vk::PipelineStageFlags2::GEOMETRY_SHADER;
        access |= vk::AccessFlags2::SHADER_READ;
        layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }
    if state.contains(ResourceStates::PIXEL_SHADER_RESOURCE) {
        stage |= vk::PipelineStageFlags2::FRAGMENT_SHADER;
        access |= vk::AccessFlags2::SHADER_READ;
        layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }
    if state.contains(ResourceStates::STREAM_OUT) {
        stage |= vk::PipelineStageFlags2::TRANSFORM_FEEDBACK_EXT;
        access |= vk::AccessFlags2::TRANSFORM_FEEDBACK_WRITE_EXT;
    }
    if state.contains(ResourceStates::INDIRECT_ARGUMENT) {
        stage |= vk::PipelineStageFlags2::DRAW_INDIRECT;
        access |= vk::AccessFlags2::INDIRECT_COMMAND_READ;
    }
    if state.contains(ResourceStates::COPY_DEST) {
        stage |= vk::PipelineStageFlags2::COPY;
        access |= vk::AccessFlags2::TRANSFER_WRITE;
        layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
    }
    if state.contains(ResourceStates::COPY_SOURCE) {
        stage |= vk::PipelineStageFlags2::COPY;
        access |= vk::AccessFlags2::TRANSFER_READ;
        layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
    }
    if state.contains(ResourceStates::RESOLVE_DEST) {
        stage |= vk::PipelineStageFlags2::RESOLVE;
        access |= vk::AccessFlags2::TRANSFER_WRITE;
        layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
    }
    if state.contains(ResourceStates::RESOLVE_SOURCE) {
        stage |= vk::PipelineStageFlags2::RESOLVE;
        access |= vk::AccessFlags2::TRANSFER_READ;
        layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
    }
    (stage, access, layout)
}

/// Translates a `{before, after}` state pair for either a buffer or an image
/// (§4.6 "ResourceBarrier").
pub fn translate_barrier(before: ResourceStates, after: ResourceStates, target: &BarrierTarget) -> TranslatedBarrier {
    let (src_stage, src_access, src_layout) = state_mapping(before);
    let (dst_stage, dst_access, dst_layout) = state_mapping(after);
    let (old_layout, new_layout) = match target {
        BarrierTarget::Buffer => (vk::ImageLayout::UNDEFINED, vk::ImageLayout::UNDEFINED),
        BarrierTarget::Image {
            ..
        } => (src_layout, dst_layout),
    };
    TranslatedBarrier {
        src_stage,
        src_access,
        dst_stage,
        dst_access,
        old_layout,
        new_layout,
    }
}

/// Per-resource state tracked inside a single command list (§4.6 "Implicit
/// state promotion and decay"). A resource starts in whatever its last
/// submission left it in (`initial`), and every barrier the list records
/// updates `current`. At submission time the engine reconciles `current`
/// against the resource's globally-tracked state for the next list.
#[derive(Debug, Clone, Copy)]
pub struct TrackedResourceState {
    pub initial: ResourceStates,
    pub current: ResourceStates,
}

impl TrackedResourceState {
    pub fn new(state: ResourceStates) -> Self {
        Self {
            initial: state,
            current: state,
        }
    }

    /// Applies a barrier to `after`, implementing D3D12's state promotion:
    /// a resource implicitly promoted to a read-only state by a prior
    /// non-barrier usage (e.g. a copy) need not have been explicitly
    /// transitioned away from `COMMON` first.
    pub fn transition(&mut self, after: ResourceStates) {
        self.current = after;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_maps_to_general_layout_and_no_access() {
        let (_, access, layout) = state_mapping(ResourceStates::COMMON);
        assert_eq!(access, vk::AccessFlags2::empty());
        assert_eq!(layout, vk::ImageLayout::GENERAL);
    }

    #[test]
    fn render_target_to_pixel_shader_resource_transitions_layout() {
        let barrier = translate_barrier(
            ResourceStates::RENDER_TARGET,
            ResourceStates::PIXEL_SHADER_RESOURCE,
            &BarrierTarget::Image {
                aspect_mask: vk::ImageAspectFlags::COLOR,
            },
        );
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(barrier.src_access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE));
        assert!(barrier.dst_access.contains(vk::AccessFlags2::SHADER_READ));
    }

    #[test]
    fn buffer_barriers_never_carry_a_layout_transition() {
        let barrier = translate_barrier(ResourceStates::COPY_DEST, ResourceStates::GENERIC_READ, &BarrierTarget::Buffer);
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn generic_read_contains_its_constituent_states() {
        assert!(ResourceStates::GENERIC_READ.contains(ResourceStates::COPY_SOURCE));
        assert!(ResourceStates::GENERIC_READ.contains(ResourceStates::INDEX_BUFFER));
        assert!(!ResourceStates::GENERIC_READ.contains(ResourceStates::RENDER_TARGET));
    }
}
