use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use raw_window_handle::{
    AndroidDisplayHandle, AndroidNdkWindowHandle, HasDisplayHandle, HasWindowHandle,
    RawDisplayHandle, RawWindowHandle,
};

use crate::error::{RenderError, Result};

/// Opaque reference to a native presentation surface.
///
/// Wraps the raw window + display handle pair a GPU backend needs to create a
/// swap chain. Equality and hashing are by handle value, never by the state of
/// the native object behind it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    window: RawWindowHandle,
    display: RawDisplayHandle,
}

// The handle is an inert token on every thread except the render thread, which
// is the only place a backend dereferences it.
unsafe impl Send for SurfaceHandle {}
unsafe impl Sync for SurfaceHandle {}

impl SurfaceHandle {
    /// Wraps an already-validated raw handle pair.
    pub fn new(window: RawWindowHandle, display: RawDisplayHandle) -> Self {
        Self { window, display }
    }

    /// Wraps an `ANativeWindow*` as delivered by a surface-created callback.
    pub fn from_android_window(a_native_window: *mut c_void) -> Result<Self> {
        let ptr = NonNull::new(a_native_window)
            .ok_or_else(|| RenderError::InvalidArgument("null native window handle".into()))?;

        Ok(Self::new(
            RawWindowHandle::AndroidNdk(AndroidNdkWindowHandle::new(ptr)),
            RawDisplayHandle::Android(AndroidDisplayHandle::new()),
        ))
    }

    /// Captures the handles of a live window (winit, SDL, ...).
    ///
    /// The caller must keep the window alive until the surface is unregistered.
    pub fn from_window<W>(window: &W) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let raw_window = window
            .window_handle()
            .map_err(|e| RenderError::InvalidArgument(format!("window handle unavailable: {e}")))?
            .as_raw();
        let raw_display = window
            .display_handle()
            .map_err(|e| RenderError::InvalidArgument(format!("display handle unavailable: {e}")))?
            .as_raw();

        Ok(Self::new(raw_window, raw_display))
    }

    pub fn raw_window_handle(&self) -> RawWindowHandle {
        self.window
    }

    pub fn raw_display_handle(&self) -> RawDisplayHandle {
        self.display
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({self})")
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window {
            RawWindowHandle::AndroidNdk(h) => write!(f, "android:{:p}", h.a_native_window),
            RawWindowHandle::Win32(h) => write!(f, "win32:{:#x}", h.hwnd.get()),
            RawWindowHandle::Xlib(h) => write!(f, "xlib:{:#x}", h.window),
            RawWindowHandle::Xcb(h) => write!(f, "xcb:{:#x}", h.window.get()),
            RawWindowHandle::Wayland(h) => write!(f, "wayland:{:p}", h.surface),
            RawWindowHandle::AppKit(h) => write!(f, "appkit:{:p}", h.ns_view),
            RawWindowHandle::UiKit(h) => write!(f, "uikit:{:p}", h.ui_view),
            other => write!(f, "{other:?}"),
        }
    }
}
