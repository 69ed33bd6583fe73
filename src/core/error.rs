//! Error taxonomy for the translation layer (§7 of the design).
//!
//! D3D12 reports failures as `HRESULT`s. We keep the same taxonomy so callers
//! translating back to a COM-style return value have a direct mapping, but
//! express it as a normal Rust enum. `anyhow::Result` is used at call sites
//! that need to bubble heterogeneous failures without matching every variant;
//! this enum is what they eventually downcast to when a caller needs the
//! exact HRESULT-equivalent.

use std::ffi::NulError;
use std::sync::PoisonError;

use gpu_allocator::AllocationError;
use thiserror::Error;

use crate::core::device::ExtensionID;

/// Error type returned by fallible operations in this crate.
///
/// Variant names mirror the D3D12 HRESULT taxonomy from §7: a caller
/// implementing the COM surface over this crate maps each variant to its
/// HRESULT (`InvalidArgument` -> `E_INVALIDARG`, `NotImplemented` ->
/// `E_NOTIMPL`, `OutOfMemory` -> `E_OUTOFMEMORY`, `Fail` -> `E_FAIL`,
/// `NoInterface` -> `E_NOINTERFACE`, `DeviceRemoved` ->
/// `DXGI_ERROR_DEVICE_REMOVED`).
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the Vulkan library.
    #[error("Failed to load Vulkan.")]
    LoadFailed(ash::LoadingError),
    /// Could not convert a Rust string to a C-string because it contains null bytes.
    #[error("Invalid C string")]
    InvalidString(NulError),
    /// Generic Vulkan error, not otherwise categorized.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// Vulkan host or device allocation failed.
    #[error("Vulkan allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// Malformed D3D12 description: inconsistent dimension/format pair, illegal
    /// state-object subobject combination, or a bad `IID` in `QueryInterface`.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Feature recognized but not mapped to Vulkan on this target (DGC without
    /// host support, certain meta commands).
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    /// Host or device memory exhausted.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    /// Generic operation failure, e.g. `Reset` called on a still-recording command list.
    #[error("Operation failed: {0}")]
    Fail(String),
    /// `QueryInterface` was asked for an interface this object does not implement.
    #[error("No such interface: {0}")]
    NoInterface(String),
    /// The device is in the sticky device-removed state; see [`crate::core::device::DeviceRemovedReason`].
    #[error("Device removed: {0:?}")]
    DeviceRemoved(crate::core::device::DeviceRemovedReason),
    /// No queue was found for the requested domain.
    #[error("No queue found for requested domain; was it requested at device creation?")]
    NoCapableQueue,
    /// Root signature's total parameter cost exceeds the D3D12 limit of 64 DWORDs.
    #[error("Root signature cost {0} exceeds the maximum of 64")]
    RootSignatureTooLarge(u32),
    /// A GPU virtual address did not resolve to any known resource.
    #[error("GPU virtual address {0:#x} does not map to a known resource")]
    UnmappedVirtualAddress(u64),
    /// Poisoned mutex: another thread panicked while holding a lock this call needed.
    #[error("Poisoned lock")]
    PoisonError,
    /// Named pipeline-state object not present in the PSO cache.
    #[error("Pipeline state `{0}` not found")]
    PipelineNotFound(String),
    /// Tried to use a descriptor set with no layout, because it was never bound to
    /// a root signature.
    #[error("No descriptor set layout available for this binding")]
    NoDescriptorSetLayout,
    /// Function call requires an extension to be enabled, but it was not requested or not available.
    #[error("Extension {0} required for this feature, but not enabled")]
    ExtensionNotSupported(ExtensionID),
    /// Uncategorized error for paths that don't map cleanly onto the HRESULT taxonomy.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::LoadingError> for Error {
    fn from(value: ash::LoadingError) -> Self {
        Error::LoadFailed(value)
    }
}

impl From<NulError> for Error {
    fn from(value: NulError) -> Self {
        Error::InvalidString(value)
    }
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
