//! Root signature parsing and descriptor-set translation (§4.4).
//!
//! A D3D12 root signature is a flat, ordered list of parameters. This module
//! flattens that list into the Vulkan constructs a command list actually
//! binds against: a push-constant layout, at most two descriptor-set layouts
//! (one push-descriptor set, one main set), and the derived
//! [`PipelineLayout`](crate::pipeline::pipeline_layout::PipelineLayout).
//!
//! Grounded on the teacher's `pipeline/pipeline_layout.rs` and
//! `pipeline/set_layout.rs` (the `Cache<Resource>` pattern for building and
//! deduplicating `VkPipelineLayout`/`VkDescriptorSetLayout` objects), and on
//! `examples/original_source/libs/vkd3d/state.c`'s
//! `d3d12_root_signature_init` for the exact binding-allocation order.

use anyhow::{ensure, Result};
use ash::vk;

use crate::core::device::ExtensionID;
use crate::pipeline::pipeline_layout::{PipelineLayout, PipelineLayoutCreateInfo, PushConstantRange};
use crate::pipeline::set_layout::DescriptorSetLayoutCreateInfo;
use crate::util::cache::Cache;
use crate::{Device, Error};

/// The D3D12 limit on total root-signature cost (§3, §8): a table costs 1
/// DWORD, a root descriptor costs 2, and `32BIT_CONSTANTS[n]` costs `n`.
pub const MAX_ROOT_SIGNATURE_COST: u32 = 64;

/// Index of the Vulkan descriptor set a root-signature parameter lands in.
/// The push-descriptor set is always set 0 when present; the main set
/// follows at set 1, or at set 0 if no push-descriptor set was needed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RootSignatureSet {
    Push,
    Main,
}

/// D3D12 descriptor range types that can appear in a `DESCRIPTOR_TABLE`
/// parameter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DescriptorRangeType {
    Srv,
    Uav,
    Cbv,
    Sampler,
}

/// One contiguous range within a `DESCRIPTOR_TABLE` root parameter.
#[derive(Debug, Clone)]
pub struct DescriptorRange {
    pub range_type: DescriptorRangeType,
    pub base_shader_register: u32,
    pub register_space: u32,
    pub descriptor_count: u32,
    /// Offset of this range within the table, in descriptors.
    pub offset_in_descriptors: u32,
    /// First Vulkan binding assigned to this range, in the main set. SRV and
    /// UAV ranges reserve `binding` for the buffer-view representation and
    /// `binding + 1` for the image-view representation, to preserve D3D12's
    /// buffer/texture polymorphism within one descriptor slot (§3, §4.4).
    pub binding: u32,
}

impl DescriptorRangeType {
    /// Number of Vulkan bindings a single descriptor in this range consumes.
    /// SRV/UAV are dual-represented (buffer view + image view); CBV and
    /// Sampler need only one.
    fn binding_width(self) -> u32 {
        match self {
            DescriptorRangeType::Srv | DescriptorRangeType::Uav => 2,
            DescriptorRangeType::Cbv | DescriptorRangeType::Sampler => 1,
        }
    }

    fn buffer_descriptor_type(self) -> vk::DescriptorType {
        match self {
            DescriptorRangeType::Srv => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
            DescriptorRangeType::Uav => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
            DescriptorRangeType::Cbv => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorRangeType::Sampler => vk::DescriptorType::SAMPLER,
        }
    }

    fn image_descriptor_type(self) -> vk::DescriptorType {
        match self {
            DescriptorRangeType::Srv => vk::DescriptorType::SAMPLED_IMAGE,
            DescriptorRangeType::Uav => vk::DescriptorType::STORAGE_IMAGE,
            DescriptorRangeType::Cbv => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorRangeType::Sampler => vk::DescriptorType::SAMPLER,
        }
    }
}

/// D3D12 shader visibility, used to pick push-constant stage flags and
/// decide whether ranges must collapse into a single `ALL` range (§4.4 step 3).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderVisibility {
    All,
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Amplification,
    Mesh,
}

impl ShaderVisibility {
    fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderVisibility::All => vk::ShaderStageFlags::ALL,
            ShaderVisibility::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderVisibility::Hull => vk::ShaderStageFlags::TESSELLATION_CONTROL,
            ShaderVisibility::Domain => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
            ShaderVisibility::Geometry => vk::ShaderStageFlags::GEOMETRY,
            ShaderVisibility::Pixel => vk::ShaderStageFlags::FRAGMENT,
            ShaderVisibility::Amplification => vk::ShaderStageFlags::TASK_EXT,
            ShaderVisibility::Mesh => vk::ShaderStageFlags::MESH_EXT,
        }
    }
}

/// A single root parameter, in declaration order (§3 "Root signature").
#[derive(Debug, Clone)]
pub enum RootParameter {
    DescriptorTable {
        visibility: ShaderVisibility,
        ranges: Vec<DescriptorRange>,
    },
    Cbv {
        visibility: ShaderVisibility,
        shader_register: u32,
        register_space: u32,
    },
    Srv {
        visibility: ShaderVisibility,
        shader_register: u32,
        register_space: u32,
    },
    Uav {
        visibility: ShaderVisibility,
        shader_register: u32,
        register_space: u32,
    },
    Constants {
        visibility: ShaderVisibility,
        shader_register: u32,
        register_space: u32,
        num_32bit_values: u32,
    },
}

impl RootParameter {
    /// Per-parameter cost toward the 64-DWORD root signature limit (§3, §8):
    /// a table costs 1, a root descriptor costs 2, `32BIT_CONSTANTS[n]` costs `n`.
    fn cost(&self) -> u32 {
        match self {
            RootParameter::DescriptorTable {
                ..
            } => 1,
            RootParameter::Cbv {
                ..
            }
            | RootParameter::Srv {
                ..
            }
            | RootParameter::Uav {
                ..
            } => 2,
            RootParameter::Constants {
                num_32bit_values, ..
            } => *num_32bit_values,
        }
    }

    fn visibility(&self) -> ShaderVisibility {
        match self {
            RootParameter::DescriptorTable {
                visibility, ..
            }
            | RootParameter::Cbv {
                visibility, ..
            }
            | RootParameter::Srv {
                visibility, ..
            }
            | RootParameter::Uav {
                visibility, ..
            }
            | RootParameter::Constants {
                visibility, ..
            } => *visibility,
        }
    }
}

/// An immutable (static) sampler declared directly in the root signature.
#[derive(Debug, Clone)]
pub struct StaticSampler {
    pub shader_register: u32,
    pub register_space: u32,
    pub visibility: ShaderVisibility,
    pub create_info: vk::SamplerCreateInfo,
}

/// Source description for [`RootSignatureLayout::build`]: either a pre-parsed
/// set of parameters (the common case once a COM-facing layer has parsed the
/// serialized blob) or used directly by tests that construct parameters by hand.
#[derive(Debug, Clone, Default)]
pub struct RootSignatureDesc {
    pub parameters: Vec<RootParameter>,
    pub static_samplers: Vec<StaticSampler>,
    /// Mirrors `D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT` and
    /// friends; not consumed by the translation itself but retained so callers
    /// building the graphics PSO's vertex input state can observe it.
    pub flags: u32,
}

/// One entry of the position-stable `descriptor_mapping[]` consumed by the
/// (external) shader compiler (§4.4 "Invariants"): for a given D3D12
/// `(register_space, shader_register)`, which Vulkan `(set, binding)` it was
/// assigned to.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMappingEntry {
    pub register_space: u32,
    pub shader_register: u32,
    pub range_type: DescriptorRangeType,
    pub set: u32,
    pub binding: u32,
}

/// The fully translated form of a root signature: everything a command list
/// needs to bind root parameters and a PSO needs to build a pipeline layout.
#[derive(Debug)]
pub struct RootSignatureLayout {
    pub parameters: Vec<RootParameter>,
    /// Position-stable; index matches the originating root parameter's index
    /// for table parameters, or is a root-descriptor entry for CBV/SRV/UAV.
    pub descriptor_mapping: Vec<DescriptorMappingEntry>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    /// `None` if no root parameter needed push descriptors (no root CBV/SRV/UAV,
    /// or `VK_KHR_push_descriptor` unavailable so everything went to the main set).
    pub push_set_layout: Option<DescriptorSetLayoutCreateInfo>,
    pub main_set_layout: DescriptorSetLayoutCreateInfo,
    pub pipeline_layout_info: PipelineLayoutCreateInfo,
    pub static_samplers: Vec<StaticSampler>,
    total_cost: u32,
}

impl RootSignatureLayout {
    pub fn total_cost(&self) -> u32 {
        self.total_cost
    }

    /// Resolve the Vulkan set index a given parameter's descriptors were
    /// assigned to, given whether a push-descriptor set exists.
    pub fn set_for(&self, set: RootSignatureSet) -> u32 {
        match set {
            RootSignatureSet::Push => 0,
            RootSignatureSet::Main => {
                if self.push_set_layout.is_some() {
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Resolve this root signature's [`PipelineLayout`] from the shared
    /// pipeline-layout cache, creating it on first use. `set_layout_cache` is
    /// the same cache the rest of the pipeline module uses to deduplicate
    /// `VkDescriptorSetLayout` objects (§4.5).
    pub fn pipeline_layout<'c>(
        &self,
        pipeline_layout_cache: &'c mut Cache<PipelineLayout>,
        set_layout_cache: &mut Cache<crate::pipeline::set_layout::DescriptorSetLayout>,
    ) -> Result<&'c PipelineLayout> {
        pipeline_layout_cache.get_or_create(&self.pipeline_layout_info, set_layout_cache)
    }

    /// Parse/translate a [`RootSignatureDesc`] into Vulkan constructs (§4.4).
    ///
    /// `push_descriptor_available` mirrors whether `VK_KHR_push_descriptor`
    /// was negotiated on the device (`Device::is_extension_enabled`); when
    /// `false`, root CBV/SRV/UAV parameters fall back to the main set exactly
    /// as the algorithm in §4.4 step 2 describes.
    pub fn build(desc: &RootSignatureDesc, push_descriptor_available: bool) -> Result<Self> {
        let total_cost: u32 = desc.parameters.iter().map(RootParameter::cost).sum();
        ensure!(
            total_cost <= MAX_ROOT_SIGNATURE_COST,
            Error::RootSignatureTooLarge(total_cost)
        );

        let mut main_bindings: Vec<vk::DescriptorSetLayoutBinding> = Vec::new();
        let mut main_flags: Vec<vk::DescriptorBindingFlags> = Vec::new();
        let mut push_bindings: Vec<vk::DescriptorSetLayoutBinding> = Vec::new();
        let mut descriptor_mapping = Vec::new();
        // §4.4 step 3: 32-bit constants are packed per visibility; if any
        // visibility is ALL, every range collapses into one, since Vulkan
        // forbids a stage from appearing in more than one push-constant range.
        let mut push_constant_offset: u32 = 0;
        let mut push_constant_ranges: Vec<PushConstantRange> = Vec::new();
        let mut collapse_push_constants = false;
        let mut next_main_binding = 0u32;

        for param in &desc.parameters {
            if let RootParameter::Constants {
                visibility, ..
            } = param
            {
                if *visibility == ShaderVisibility::All {
                    collapse_push_constants = true;
                }
            }
        }

        for param in &desc.parameters {
            match param {
                RootParameter::DescriptorTable {
                    visibility,
                    ranges,
                } => {
                    for range in ranges {
                        let stage_flags = visibility.to_vk();
                        let buffer_binding = vk::DescriptorSetLayoutBinding {
                            binding: range.binding,
                            descriptor_type: range.range_type.buffer_descriptor_type(),
                            descriptor_count: range.descriptor_count,
                            stage_flags,
                            p_immutable_samplers: std::ptr::null(),
                        };
                        main_bindings.push(buffer_binding);
                        main_flags.push(vk::DescriptorBindingFlags::empty());
                        descriptor_mapping.push(DescriptorMappingEntry {
                            register_space: range.register_space,
                            shader_register: range.base_shader_register,
                            range_type: range.range_type,
                            set: u32::MAX, // resolved below once set indices are known
                            binding: range.binding,
                        });
                        if range.range_type.binding_width() == 2 {
                            let image_binding = vk::DescriptorSetLayoutBinding {
                                binding: range.binding + 1,
                                descriptor_type: range.range_type.image_descriptor_type(),
                                descriptor_count: range.descriptor_count,
                                stage_flags,
                                p_immutable_samplers: std::ptr::null(),
                            };
                            main_bindings.push(image_binding);
                            main_flags.push(vk::DescriptorBindingFlags::empty());
                        }
                        next_main_binding =
                            next_main_binding.max(range.binding + range.range_type.binding_width());
                    }
                }
                RootParameter::Cbv {
                    visibility,
                    shader_register,
                    register_space,
                }
                | RootParameter::Srv {
                    visibility,
                    shader_register,
                    register_space,
                }
                | RootParameter::Uav {
                    visibility,
                    shader_register,
                    register_space,
                } => {
                    let range_type = match param {
                        RootParameter::Cbv {
                            ..
                        } => DescriptorRangeType::Cbv,
                        RootParameter::Srv {
                            ..
                        } => DescriptorRangeType::Srv,
                        RootParameter::Uav {
                            ..
                        } => DescriptorRangeType::Uav,
                        _ => unreachable!(),
                    };
                    let stage_flags = visibility.to_vk();
                    let target = if push_descriptor_available {
                        &mut push_bindings
                    } else {
                        &mut main_bindings
                    };
                    let binding = target.len() as u32;
                    target.push(vk::DescriptorSetLayoutBinding {
                        binding,
                        descriptor_type: range_type.buffer_descriptor_type(),
                        descriptor_count: 1,
                        stage_flags,
                        p_immutable_samplers: std::ptr::null(),
                    });
                    if !push_descriptor_available {
                        main_flags.push(vk::DescriptorBindingFlags::empty());
                    }
                    descriptor_mapping.push(DescriptorMappingEntry {
                        register_space: *register_space,
                        shader_register: *shader_register,
                        range_type,
                        set: u32::MAX,
                        binding,
                    });
                }
                RootParameter::Constants {
                    visibility,
                    num_32bit_values,
                    ..
                } => {
                    let size = num_32bit_values * 4;
                    if collapse_push_constants {
                        let total = push_constant_ranges
                            .iter()
                            .map(|r| r.offset + r.size)
                            .max()
                            .unwrap_or(0);
                        if let Some(existing) = push_constant_ranges.first_mut() {
                            existing.size = existing.size.max(total + size);
                            existing.stage_flags = vk::ShaderStageFlags::ALL;
                        } else {
                            push_constant_ranges.push(PushConstantRange {
                                stage_flags: vk::ShaderStageFlags::ALL,
                                offset: 0,
                                size,
                            });
                        }
                    } else {
                        push_constant_ranges.push(PushConstantRange {
                            stage_flags: visibility.to_vk(),
                            offset: push_constant_offset,
                            size,
                        });
                        push_constant_offset += size;
                    }
                }
            }
        }

        for sampler in &desc.static_samplers {
            let binding = next_main_binding;
            next_main_binding += 1;
            main_bindings.push(vk::DescriptorSetLayoutBinding {
                binding,
                descriptor_type: vk::DescriptorType::SAMPLER,
                descriptor_count: 1,
                stage_flags: sampler.visibility.to_vk(),
                // Immutable samplers are attached when the Vulkan
                // `VkSampler` is created out-of-band; the handle is filled in
                // by the caller that owns the sampler cache before this
                // binding is passed to `vkCreateDescriptorSetLayout`.
                p_immutable_samplers: std::ptr::null(),
            });
            main_flags.push(vk::DescriptorBindingFlags::empty());
        }

        let push_set_layout = if push_bindings.is_empty() {
            None
        } else {
            Some(DescriptorSetLayoutCreateInfo {
                bindings: push_bindings,
                persistent: false,
                flags: vec![vk::DescriptorBindingFlags::empty(); 0],
            })
        };

        // Resolve the now-known set indices in descriptor_mapping.
        let push_set_index = 0u32;
        let main_set_index = if push_set_layout.is_some() {
            1
        } else {
            0
        };
        let mut push_binding_cursor = 0u32;
        for entry in &mut descriptor_mapping {
            let is_root_descriptor = desc.parameters.iter().any(|p| {
                matches!(
                    p,
                    RootParameter::Cbv { shader_register, register_space, .. }
                    | RootParameter::Srv { shader_register, register_space, .. }
                    | RootParameter::Uav { shader_register, register_space, .. }
                    if *shader_register == entry.shader_register && *register_space == entry.register_space
                )
            });
            if is_root_descriptor && push_descriptor_available {
                entry.set = push_set_index;
                entry.binding = push_binding_cursor;
                push_binding_cursor += 1;
            } else {
                entry.set = main_set_index;
            }
        }

        let main_set_layout = DescriptorSetLayoutCreateInfo {
            bindings: main_bindings,
            persistent: false,
            flags: main_flags,
        };

        let mut set_layouts = Vec::new();
        if let Some(push) = &push_set_layout {
            set_layouts.push(push.clone());
        }
        set_layouts.push(main_set_layout.clone());

        let pipeline_layout_info = PipelineLayoutCreateInfo {
            flags: vk::PipelineLayoutCreateFlags::empty(),
            set_layouts,
            push_constants: push_constant_ranges.clone(),
            persistent: false,
        };

        Ok(RootSignatureLayout {
            parameters: desc.parameters.clone(),
            descriptor_mapping,
            push_constant_ranges,
            push_set_layout,
            main_set_layout,
            pipeline_layout_info,
            static_samplers: desc.static_samplers.clone(),
            total_cost,
        })
    }
}

/// Required extension this module consumes when deciding the push-descriptor
/// fallback (§4.4 step 2).
pub fn push_descriptor_available(device: &Device) -> bool {
    device.is_extension_enabled(ExtensionID::PushDescriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_param(visibility: ShaderVisibility, range_type: DescriptorRangeType, binding: u32) -> RootParameter {
        RootParameter::DescriptorTable {
            visibility,
            ranges: vec![DescriptorRange {
                range_type,
                base_shader_register: 0,
                register_space: 0,
                descriptor_count: 1,
                offset_in_descriptors: 0,
                binding,
            }],
        }
    }

    #[test]
    fn cost_accounting_rejects_oversized_signatures() {
        let mut parameters = Vec::new();
        for _ in 0..33 {
            parameters.push(RootParameter::Cbv {
                visibility: ShaderVisibility::All,
                shader_register: 0,
                register_space: 0,
            });
        }
        let desc = RootSignatureDesc {
            parameters,
            static_samplers: vec![],
            flags: 0,
        };
        let result = RootSignatureLayout::build(&desc, true);
        assert!(result.is_err());
    }

    /// §8 scenario 2: one 32-bit-constants parameter (4 values, ALL) plus one
    /// SRV table (PIXEL) produces a single 16-byte ALL-stage push-constant
    /// range and one push-descriptor binding at set 0 binding 0 with
    /// fragment-only stage flags... except here the SRV is a root descriptor's
    /// sibling case: a one-range SRV table at binding 0.
    #[test]
    fn constants_and_srv_table_scenario() {
        let desc = RootSignatureDesc {
            parameters: vec![
                RootParameter::Constants {
                    visibility: ShaderVisibility::All,
                    shader_register: 0,
                    register_space: 0,
                    num_32bit_values: 4,
                },
                table_param(ShaderVisibility::Pixel, DescriptorRangeType::Srv, 0),
            ],
            static_samplers: vec![],
            flags: 0,
        };
        let layout = RootSignatureLayout::build(&desc, true).unwrap();
        assert_eq!(layout.push_constant_ranges.len(), 1);
        assert_eq!(layout.push_constant_ranges[0].size, 16);
        assert_eq!(layout.push_constant_ranges[0].stage_flags, vk::ShaderStageFlags::ALL);
        // table SRV with no root descriptor present: no push set allocated.
        assert!(layout.push_set_layout.is_none());
        assert_eq!(layout.main_set_layout.bindings[0].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn srv_and_uav_ranges_reserve_two_bindings() {
        let desc = RootSignatureDesc {
            parameters: vec![table_param(ShaderVisibility::All, DescriptorRangeType::Uav, 0)],
            static_samplers: vec![],
            flags: 0,
        };
        let layout = RootSignatureLayout::build(&desc, true).unwrap();
        assert_eq!(layout.main_set_layout.bindings.len(), 2);
        assert_eq!(layout.main_set_layout.bindings[0].binding, 0);
        assert_eq!(layout.main_set_layout.bindings[1].binding, 1);
    }

    #[test]
    fn root_descriptor_uses_push_set_when_available() {
        let desc = RootSignatureDesc {
            parameters: vec![RootParameter::Srv {
                visibility: ShaderVisibility::Pixel,
                shader_register: 0,
                register_space: 0,
            }],
            static_samplers: vec![],
            flags: 0,
        };
        let layout = RootSignatureLayout::build(&desc, true).unwrap();
        assert!(layout.push_set_layout.is_some());
        assert!(layout.main_set_layout.bindings.is_empty());
    }

    #[test]
    fn root_descriptor_falls_back_to_main_set_without_push_descriptor() {
        let desc = RootSignatureDesc {
            parameters: vec![RootParameter::Srv {
                visibility: ShaderVisibility::Pixel,
                shader_register: 0,
                register_space: 0,
            }],
            static_samplers: vec![],
            flags: 0,
        };
        let layout = RootSignatureLayout::build(&desc, false).unwrap();
        assert!(layout.push_set_layout.is_none());
        assert_eq!(layout.main_set_layout.bindings.len(), 1);
    }
}
