use thiserror::Error;

use crate::surface::{OutputSurface, Viewport};

/// Failure reported by a [`GpuBackend`] call.
///
/// [`GpuContext`](super::GpuContext) translates these into the crate-level
/// taxonomy: `ContextLost` halts the loop, `SurfaceLost` retires the surface,
/// `Transient` drops the frame for that surface only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("device lost: {0}")]
    ContextLost(String),

    #[error("native surface lost: {0}")]
    SurfaceLost(String),

    #[error("transient: {0}")]
    Transient(String),
}

/// GPU-side operations the context state machine drives.
///
/// All calls happen on the thread that owns the [`GpuContext`](super::GpuContext).
/// A backend never decides *when* to bind or present; it only performs the
/// work and reports failures.
pub trait GpuBackend {
    /// One acquired frame for one surface (swap-chain image, command encoder...).
    type Pass;

    /// Called once before the first bind.
    fn initialize(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// `true` once the device has been lost behind our back.
    fn is_lost(&self) -> bool {
        false
    }

    /// Creates the GPU-side binding (swap chain) for `surface`.
    fn attach(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<(), BackendError>;

    /// Acquires the next image of an attached surface.
    fn begin(&mut self, surface: &OutputSurface, viewport: Viewport) -> Result<Self::Pass, BackendError>;

    /// Submits the recorded work and presents it.
    fn end(&mut self, surface: &OutputSurface, pass: Self::Pass) -> Result<(), BackendError>;

    /// Discards an acquired image without presenting it.
    fn abandon(&mut self, surface: &OutputSurface, pass: Self::Pass);

    /// Destroys the binding created by `attach`.
    fn detach(&mut self, surface: &OutputSurface);

    /// Frees every remaining device resource. No call follows this one.
    fn shutdown(&mut self);
}
