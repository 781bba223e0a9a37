use std::ffi::c_void;
use std::fmt;

use super::{SurfaceHandle, Viewport};
use crate::error::Result;

/// Immutable description of one renderable destination.
///
/// A resize or handle swap produces a new value; comparing against the
/// previously stored value is how stale targets are detected. Equality and
/// hashing cover all three fields.
///
/// Dimensions are kept signed because producers may report degenerate sizes
/// (zero or negative). Such values are representable but not renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSurface {
    handle: SurfaceHandle,
    width: i32,
    height: i32,
}

impl OutputSurface {
    pub fn new(handle: SurfaceHandle, width: i32, height: i32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }

    /// Builds a surface from an `ANativeWindow*`; fails with `InvalidArgument` on null.
    pub fn from_native_window(a_native_window: *mut c_void, width: i32, height: i32) -> Result<Self> {
        let handle = SurfaceHandle::from_android_window(a_native_window)?;
        Ok(Self::new(handle, width, height))
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Same native surface with new dimensions.
    pub fn resized(&self, width: i32, height: i32) -> Self {
        Self::new(self.handle, width, height)
    }

    pub fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Viewport covering the whole surface, `None` when not renderable.
    pub fn viewport(&self) -> Option<Viewport> {
        Viewport::from_dimensions(self.width, self.height)
    }
}

impl fmt::Display for OutputSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}x{}", self.handle, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::*;
    use crate::error::RenderError;

    fn surface(addr: usize, w: i32, h: i32) -> OutputSurface {
        OutputSurface::from_native_window(addr as *mut c_void, w, h).unwrap()
    }

    fn hash_of(s: &OutputSurface) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn fields_read_back_as_given() {
        for (addr, w, h) in [(0x10, 1920, 1080), (0x20, 1080, 1920), (0x30, 1, 1)] {
            let s = surface(addr, w, h);
            assert_eq!(s.handle(), SurfaceHandle::from_android_window(addr as *mut c_void).unwrap());
            assert_eq!(s.width(), w);
            assert_eq!(s.height(), h);
        }
    }

    #[test]
    fn null_handle_is_invalid_argument() {
        let err = OutputSurface::from_native_window(std::ptr::null_mut(), 640, 480).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }

    #[test]
    fn degenerate_size_is_constructible_but_not_renderable() {
        let s = surface(0x10, 0, 1080);
        assert!(!s.is_renderable());
        assert!(s.viewport().is_none());

        let s = surface(0x10, 640, -1);
        assert!(!s.is_renderable());
    }

    // ── equality ──────────────────────────────────────────────────────────

    #[test]
    fn identical_fields_are_equal_and_hash_alike() {
        let a = surface(0x10, 1920, 1080);
        let b = surface(0x10, 1920, 1080);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn any_differing_field_breaks_equality() {
        let base = surface(0x10, 1920, 1080);
        assert_ne!(base, surface(0x20, 1920, 1080));
        assert_ne!(base, surface(0x10, 1921, 1080));
        assert_ne!(base, surface(0x10, 1920, 1081));
    }

    #[test]
    fn resized_keeps_handle_and_yields_new_value() {
        let base = surface(0x10, 1920, 1080);
        let rotated = base.resized(1080, 1920);
        assert_eq!(rotated.handle(), base.handle());
        assert_ne!(rotated, base);
        assert_eq!(rotated.viewport(), Viewport::from_dimensions(1080, 1920));
    }
}
