use std::mem::size_of;
use ash::vk;

/// Simple trait to get the size of one element in bytes of a `vk::Format`.
pub trait ByteSize {
    /// Returns the size, in bytes, of one element of this thing.
    fn byte_size(&self) -> usize;
}

impl ByteSize for vk::Format {
    /// If an image is created with this format, then the return value of this function is the size in bytes of one pixel.
    ///
    /// Used to compute `APPEND_ALIGNED_ELEMENT` offsets for `D3D12_INPUT_ELEMENT_DESC` (§4.5):
    /// covers the Vulkan formats that appear as DXGI vertex-attribute formats.
    fn byte_size(&self) -> usize {
        match *self {
            vk::Format::R32_SFLOAT | vk::Format::R32_UINT | vk::Format::R32_SINT => size_of::<f32>(),
            vk::Format::R32G32_SFLOAT | vk::Format::R32G32_UINT | vk::Format::R32G32_SINT => 2 * size_of::<f32>(),
            vk::Format::R32G32B32_SFLOAT | vk::Format::R32G32B32_UINT | vk::Format::R32G32B32_SINT => {
                3 * size_of::<f32>()
            }
            vk::Format::R32G32B32A32_SFLOAT | vk::Format::R32G32B32A32_UINT | vk::Format::R32G32B32A32_SINT => {
                4 * size_of::<f32>()
            }
            vk::Format::R16_SFLOAT | vk::Format::R16_UNORM | vk::Format::R16_UINT | vk::Format::R16_SINT => 2,
            vk::Format::R16G16_SFLOAT | vk::Format::R16G16_UNORM | vk::Format::R16G16_UINT | vk::Format::R16G16_SINT => 4,
            vk::Format::R16G16B16A16_SFLOAT
            | vk::Format::R16G16B16A16_UNORM
            | vk::Format::R16G16B16A16_UINT
            | vk::Format::R16G16B16A16_SINT => 8,
            vk::Format::R8_UNORM | vk::Format::R8_UINT | vk::Format::R8_SINT | vk::Format::R8_SNORM => 1,
            vk::Format::R8G8_UNORM | vk::Format::R8G8_UINT | vk::Format::R8G8_SINT | vk::Format::R8G8_SNORM => 2,
            vk::Format::R8G8B8_UNORM | vk::Format::R8G8B8_UINT | vk::Format::R8G8B8_SINT | vk::Format::R8G8B8_SNORM => 3,
            vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_UINT
            | vk::Format::R8G8B8A8_SINT
            | vk::Format::R8G8B8A8_SNORM
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::A2B10G10R10_UNORM_PACK32
            | vk::Format::A2B10G10R10_UINT_PACK32 => 4,
            other => panic!("unsupported vertex attribute format: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_vertex_formats_report_expected_sizes() {
        assert_eq!(vk::Format::R32G32B32_SFLOAT.byte_size(), 12);
        assert_eq!(vk::Format::R8G8B8A8_UNORM.byte_size(), 4);
        assert_eq!(vk::Format::R16G16_SFLOAT.byte_size(), 4);
    }
}