/// Viewport size in physical pixels.
///
/// Always derived from the bound [`OutputSurface`](super::OutputSurface), so a
/// viewport that exists is never zero-sized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Returns `None` for zero or negative dimensions.
    #[inline]
    pub fn from_dimensions(width: i32, height: i32) -> Option<Self> {
        if width > 0 && height > 0 {
            Some(Self {
                width: width as u32,
                height: height as u32,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
