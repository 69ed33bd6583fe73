//! Utilities for generic window handling

use raw_window_handle::{
    HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle,
};
#[cfg(feature = "winit")]
use winit;

/// Trait for windows that exposes the content width and height of a window.
pub trait WindowSize {
    /// Get the width of the window
    fn width(&self) -> u32;
    /// Get the height of the window
    fn height(&self) -> u32;
}

#[cfg(feature = "winit")]
impl WindowSize for winit::window::Window {
    fn width(&self) -> u32 {
        self.inner_size().width
    }

    fn height(&self) -> u32 {
        self.inner_size().height
    }
}

/// Generic "window" trait that is applied to all raw_window_handle providers and those who implement window size
pub trait Window: WindowSize + HasRawDisplayHandle + HasRawWindowHandle {}
impl<T: WindowSize + HasRawDisplayHandle + HasRawWindowHandle> Window for T {}

/// Bound used for the `Window` generic parameter of [`AppSettings`](crate::AppSettings). A
/// type satisfying this is anything that can plug into context creation, whether or not it
/// is ever used as an actual windowing surface.
///
/// This is the same requirement as [`Window`], stated separately so headless contexts (see
/// [`HeadlessWindowInterface`]) can be named without implying an actual on-screen window.
pub trait WindowInterface: Window {}
impl<T: Window> WindowInterface for T {}

/// Used as a dummy window interface in case of a headless context. Calling any of the
/// `raw_xxx_handle()` functions on this will result in a panic, since a headless context
/// never actually dereferences its window.
pub struct HeadlessWindowInterface;

unsafe impl HasRawWindowHandle for HeadlessWindowInterface {
    fn raw_window_handle(&self) -> RawWindowHandle {
        panic!("called raw_window_handle() on headless window context");
    }
}

unsafe impl HasRawDisplayHandle for HeadlessWindowInterface {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        panic!("called raw_display_handle() on headless window context");
    }
}

impl WindowSize for HeadlessWindowInterface {
    fn width(&self) -> u32 {
        panic!("called width() on headless window context");
    }

    fn height(&self) -> u32 {
        panic!("called height() on headless window context");
    }
}