use std::sync::Arc;
use std::time::Duration;

use crate::error::{RenderError, Result};

/// Column-major 4x4 identity.
pub const IDENTITY_TRANSFORM: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// One image delivered by the capture side.
///
/// Pixels are tightly packed RGBA8 rows. The buffer is shared, so cloning a
/// frame to hand it to several consumers does not copy the image.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    timestamp: Duration,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    transform: [f32; 16],
}

impl CameraFrame {
    /// Wraps an RGBA8 buffer. Fails with `InvalidArgument` on zero dimensions
    /// or when the buffer length is not `width * height * 4`.
    pub fn rgba(
        timestamp: Duration,
        width: u32,
        height: u32,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let pixels = pixels.into();

        if width == 0 || height == 0 {
            return Err(RenderError::InvalidArgument(format!(
                "camera frame has degenerate size {width}x{height}"
            )));
        }

        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::InvalidArgument(format!(
                "camera frame {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }

        Ok(Self {
            timestamp,
            width,
            height,
            pixels,
            transform: IDENTITY_TRANSFORM,
        })
    }

    /// Attaches the texture transform reported by the camera for this frame.
    pub fn with_transform(mut self, transform: [f32; 16]) -> Self {
        self.transform = transform;
        self
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn transform(&self) -> &[f32; 16] {
        &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_length_must_match_dimensions() {
        let ok = CameraFrame::rgba(Duration::ZERO, 2, 2, vec![0u8; 16]).unwrap();
        assert_eq!((ok.width(), ok.height()), (2, 2));
        assert_eq!(ok.transform(), &IDENTITY_TRANSFORM);

        let err = CameraFrame::rgba(Duration::ZERO, 2, 2, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }

    #[test]
    fn zero_size_frame_is_rejected() {
        let err = CameraFrame::rgba(Duration::ZERO, 0, 4, Vec::new()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }

    #[test]
    fn clones_share_pixels() {
        let a = CameraFrame::rgba(Duration::from_millis(5), 1, 1, vec![1, 2, 3, 4]).unwrap();
        let b = a.clone();
        assert!(std::ptr::eq(a.pixels().as_ptr(), b.pixels().as_ptr()));
    }
}
