//! Builds up the per-draw/dispatch `DescriptorSetBinding` the root-signature dirty-flush
//! (§4.6 `SetGraphics/ComputeRoot*`) writes into the main descriptor set. Root descriptors
//! and tables are resolved from the bound [`RootSignatureLayout`](crate::root_signature::RootSignatureLayout)
//! rather than from shader reflection, since D3D12 root signatures are an explicit binding
//! model, not one inferred from shader bytecode.

use std::marker::PhantomData;

use ash::vk;

use crate::{BufferView, ImageView, Sampler};
use crate::descriptor::descriptor_set::{
    DescriptorBinding, DescriptorBufferInfo, DescriptorContents, DescriptorImageInfo,
    DescriptorSetBinding,
};

/// This structure is used to build up `DescriptorSetBinding` objects for requesting descriptor sets.
/// # Example usage
/// ```
/// use d3d12vk::DescriptorSetBuilder;
/// // Create a descriptor set with a single binding, and bind `my_image_view` together with
/// // `my_sampler` as a combined image sampler.
/// let set = DescriptorSetBuilder::new()
///             .bind_sampled_image(0, my_image_view.clone(), &my_sampler)
///             .build();
/// ```
pub struct DescriptorSetBuilder<'a> {
    inner: DescriptorSetBinding,
    _phantom: PhantomData<&'a i32>,
}

impl<'r> DescriptorSetBuilder<'r> {
    /// Create a new empty descriptor set builder.
    pub fn new() -> Self {
        Self {
            inner: DescriptorSetBinding {
                pool: vk::DescriptorPool::null(),
                bindings: vec![],
                layout: vk::DescriptorSetLayout::null(),
            },
            _phantom: PhantomData,
        }
    }

    /// Bind an image view to the given binding as a [`vk::DescriptorType::COMBINED_IMAGE_SAMPLER`]
    pub fn bind_sampled_image(&mut self, binding: u32, image: &ImageView, sampler: &Sampler) -> () {
        self.inner.bindings.push(DescriptorBinding {
            binding,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptors: vec![DescriptorContents::Image(DescriptorImageInfo {
                sampler: unsafe { sampler.handle() },
                view: image.clone(),
                layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            })],
        });
    }

    /// Bind a uniform buffer to the specified slot.
    pub fn bind_uniform_buffer(&mut self, binding: u32, buffer: &BufferView) -> () {
        self.inner.bindings.push(DescriptorBinding {
            binding,
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptors: vec![DescriptorContents::Buffer(DescriptorBufferInfo {
                buffer: buffer.clone(),
            })],
        });
    }

    /// Build the descriptor set creation info to pass into the cache.
    pub fn build(self) -> DescriptorSetBinding {
        self.inner
    }
}