use thiserror::Error;

use crate::capture::CameraFrame;
use crate::device::GpuBackend;
use crate::render::RenderTarget;

/// Failure of one effect invocation. Skips the present for that target only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EffectError(String);

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Per-frame render step, opaque to the render loop.
///
/// Called once per frame per active target, with that target bound.
pub trait Effect<B: GpuBackend> {
    fn apply(&mut self, frame: &CameraFrame, target: &mut RenderTarget<'_, B>) -> Result<(), EffectError>;
}

impl<B: GpuBackend, E: Effect<B> + ?Sized> Effect<B> for Box<E> {
    fn apply(&mut self, frame: &CameraFrame, target: &mut RenderTarget<'_, B>) -> Result<(), EffectError> {
        (**self).apply(frame, target)
    }
}
