use crate::capture::IDENTITY_TRANSFORM;
use crate::device::GpuBackend;
use crate::surface::{OutputSurface, Viewport};
use crate::time::FrameTime;

/// Effect-facing view of the bound surface: backend resources plus the
/// acquired pass. Only obtainable between `make_current` and `present`.
pub struct RenderTarget<'a, B: GpuBackend> {
    backend: &'a B,
    pass: &'a mut B::Pass,
    surface: OutputSurface,
    viewport: Viewport,
    transform: [f32; 16],
    time: FrameTime,
}

impl<'a, B: GpuBackend> RenderTarget<'a, B> {
    #[inline]
    pub(crate) fn new(
        backend: &'a B,
        pass: &'a mut B::Pass,
        surface: OutputSurface,
        viewport: Viewport,
    ) -> Self {
        Self {
            backend,
            pass,
            surface,
            viewport,
            transform: IDENTITY_TRANSFORM,
            time: FrameTime::default(),
        }
    }

    pub(crate) fn with_frame(mut self, transform: [f32; 16], time: FrameTime) -> Self {
        self.transform = transform;
        self.time = time;
        self
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    pub fn pass(&mut self) -> &mut B::Pass {
        &mut *self.pass
    }

    /// Backend and pass together, for effects that record with one and read
    /// device handles from the other.
    pub fn parts(&mut self) -> (&B, &mut B::Pass) {
        (self.backend, &mut *self.pass)
    }

    pub fn surface(&self) -> OutputSurface {
        self.surface
    }

    /// Equals the bound surface's dimensions.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Target-specific transform (column-major), applied after the frame's
    /// own texture transform.
    pub fn transform(&self) -> &[f32; 16] {
        &self.transform
    }

    /// Timing of the frame being rendered.
    pub fn frame_time(&self) -> FrameTime {
        self.time
    }
}
