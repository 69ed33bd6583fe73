//! D3D12-on-Vulkan translation layer
//!
//! `d3d12vk` translates D3D12 command lists, queue submission and resource binding onto a
//! Vulkan backend. It manages common issues like synchronization and resource tracking so the
//! caller only has to think in D3D12 terms while the crate handles the Vulkan boilerplate underneath.
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import all important traits
//! use d3d12vk::prelude::traits;
//! // Import types under a namespace.
//! use d3d12vk::prelude as d3d12;
//!
//! // Or, if you dont care about using the types under a namespace
//! use d3d12vk::prelude::*;
//! ```
//!
//! # Example
//!
//! For illustrative purposes, we will use winit here. Any windowing library can be supported by implementing a few trait objects
//! necessary to satisfy the [`WindowInterface`](crate::WindowInterface) trait.
//! ```ignore
//! use winit::window::WindowBuilder;
//! use winit::event_loop::EventLoopBuilder;
//! let event_loop = EventLoopBuilder::new().build();
//! let window = WindowBuilder::new()
//!     .with_title("d3d12vk test app")
//!     .build(&event_loop)
//!     .unwrap();
//! ```
//! First, we will define an [`AppSettings`](crate::AppSettings) structure that outlines requirements
//! and information about our application. This is used to
//! pick a suitable GPU to run your program on and initialize Vulkan for it.
//! ```ignore
//! # use winit::window::WindowBuilder;
//! # use winit::event_loop::EventLoopBuilder;
//! # let event_loop = EventLoopBuilder::new().build();
//! # let window = WindowBuilder::new().build(&event_loop).unwrap();
//! use d3d12vk::prelude::*;
//!
//! let settings = AppBuilder::new()
//!         .version((1, 0, 0))
//!         .name("d3d12vk demo app")
//!         .validation(true)
//!         .window(&window)
//!         .present_mode(vk::PresentModeKHR::MAILBOX)
//!         .scratch_size(1 * 1024u64) // 1 KiB scratch memory per buffer type per frame
//!         .gpu(GPURequirements {
//!             dedicated: true,
//!             min_video_memory: 1 * 1024 * 1024 * 1024, // 1 GiB.
//!             min_dedicated_video_memory: 1 * 1024 * 1024 * 1024,
//!             queues: vec![
//!                 QueueRequest { dedicated: false, queue_type: QueueType::Graphics },
//!                 QueueRequest { dedicated: true, queue_type: QueueType::Transfer },
//!                 QueueRequest { dedicated: true, queue_type: QueueType::Compute }
//!             ],
//!             ..Default::default()
//!         })
//!         .build();
//! ```
//! Now we are ready to initialize the library. [`initialize`](crate::core::init::initialize)
//! creates the Vulkan instance, selects a physical device, creates the logical device and
//! allocator, and (unless `headless` is set) the surface and swapchain described by `settings`.
//! ```ignore
//! # use winit::window::WindowBuilder;
//! # use winit::event_loop::EventLoopBuilder;
//! # let event_loop = EventLoopBuilder::new().build();
//! # let window = WindowBuilder::new().build(&event_loop).unwrap();
//! use d3d12vk::prelude::*;
//!
//! # let settings = AppBuilder::new().window(&window).build();
//! let (instance, physical_device, surface, device, allocator, pool, exec, frame, debug_messenger) =
//!     d3d12vk::initialize(&settings, false)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//! For further example code, check out the following modules
//! - [`pipeline`] for pipeline creation and management.
//! - [`wsi`] for managing your main loop and frame rendering logic.
//! - [`sync`] for various synchronization primitives, threading utilities, gpu futures and queue synchronization.
//! - [`descriptor`] for descriptor set management.
//! - [`command_buffer`] for different Vulkan commands available.
//! - [`allocator`] For various allocators and related utilities.
//! - [`image`] for managing [`VkImage`](vk::Image) and [`VkImageView`](vk::ImageView) objects.
//! - [`buffer`] for managing [`VkBuffer`](vk::Buffer) objects.
//! - [`util`] for various utilities and common patterns like buffer uploads.

#![feature(never_type)]
#![feature(fn_traits)]
#![feature(stmt_expr_attributes)]
#![feature(min_specialization)]

#[macro_use]
extern crate derivative;
#[macro_use] extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod resource;
pub mod root_signature;
pub mod va_map;
pub mod command_buffer;
pub mod pipeline;
pub mod descriptor;
pub mod sampler;
pub mod util;
pub mod core;
pub mod sync;
pub mod domain;
pub mod allocator;
pub mod wsi;