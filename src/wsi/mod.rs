//! The wsi module provides utilities for interacting with the window and rendering frames.
//! If you are using a headless context, you can largely ignore this module.

pub mod frame;
pub mod surface;
pub mod swapchain;
pub mod window;
