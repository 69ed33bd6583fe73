//! Exposes common Vulkan resources such as buffers and images.

pub mod buffer;
pub mod gpu_resource;
pub mod heap;
pub mod image;
pub mod pool;
pub mod query_pool;
pub mod raytracing;
pub mod sampler;
pub mod view;
