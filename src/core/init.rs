//! Exposes methods to make initialization of the library easier without losing flexibility.

use anyhow::Result;

use crate::pool::{ResourcePool, ResourcePoolCreateInfo};
use crate::{
    Allocator, AppSettings, DebugMessenger, DefaultAllocator, Device, ExecutionManager,
    FrameManager, Instance, PhysicalDevice, Surface, WindowInterface,
};

/// Struct that contains all common resources needed to start issuing commands.
pub type Context<A> = (
    Instance,
    PhysicalDevice,
    Option<Surface>,
    Device,
    A,
    ResourcePool<A>,
    ExecutionManager,
    Option<FrameManager<A>>,
    Option<DebugMessenger>,
);

/// Initialize the context with the default allocator.
pub fn initialize<Window: WindowInterface>(
    settings: &AppSettings<Window>,
    headless: bool,
) -> Result<Context<DefaultAllocator>> {
    initialize_with_allocator(settings, headless, |instance, physical_device, device| {
        DefaultAllocator::new(instance, device, physical_device)
    })
}

/// Initialize the context with a custom allocator.
///
/// `headless` controls whether a [`Surface`] and [`FrameManager`] are created even when
/// `settings.window` is set; passing `true` skips presentation setup entirely, which is
/// useful for compute-only or test contexts that still construct a real `AppSettings<Window>`.
pub fn initialize_with_allocator<
    Window: WindowInterface,
    A: Allocator + 'static,
    F: FnOnce(&Instance, &PhysicalDevice, &Device) -> Result<A>,
>(
    settings: &AppSettings<Window>,
    headless: bool,
    make_alloc: F,
) -> Result<Context<A>> {
    let instance = Instance::new(settings)?;

    let surface_settings = if headless { None } else { settings.surface_settings() };

    let mut surface = match &surface_settings {
        Some(s) => Some(Surface::new(&instance, s.window)?),
        None => None,
    };

    let physical_device = PhysicalDevice::select(&instance, surface.as_ref(), settings)?;

    if let Some(surface) = surface.as_mut() {
        surface.query_details(&physical_device)?;
    }

    let device = Device::new(&instance, &physical_device, settings)?;
    let allocator = make_alloc(&instance, &physical_device, &device)?;

    let scratch_size = settings
        .scratch_vbo_size
        .max(settings.scratch_ibo_size)
        .max(settings.scratch_ubo_size)
        .max(settings.scratch_ssbo_size);
    let pool_info = ResourcePoolCreateInfo {
        device: device.clone(),
        allocator: allocator.clone(),
        scratch_size,
    };
    let pool = ResourcePool::new(pool_info)?;
    let exec = ExecutionManager::new(device.clone(), &physical_device)?;

    let frame = match (&surface_settings, &surface) {
        (Some(surface_settings), Some(surface)) => Some(FrameManager::new_with_swapchain(
            &instance,
            device.clone(),
            pool.clone(),
            surface_settings,
            surface,
        )?),
        _ => None,
    };

    let debug_messenger = if settings.enable_validation {
        Some(DebugMessenger::new(&instance)?)
    } else {
        None
    };

    Ok((
        instance,
        physical_device,
        surface,
        device,
        allocator,
        pool,
        exec,
        frame,
        debug_messenger,
    ))
}
