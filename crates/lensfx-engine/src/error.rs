use std::time::Duration;

use thiserror::Error;

use crate::surface::{OutputSurface, TargetId};

/// Errors produced by the surface registry, the GPU context and the render loop.
///
/// Per-target errors (`InvalidSurface`, `EffectFailure`, `FrameDropped`) are
/// isolated to the target that raised them. `ContextLost` and
/// `PreconditionViolation` halt the loop; see [`RenderError::is_fatal`].
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Malformed input (null handle, degenerate dimensions, bad frame buffer).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup of an identifier that has no registered surface.
    #[error("no surface registered for target `{0}`")]
    NotFound(TargetId),

    /// The surface was released or its native handle is gone.
    #[error("surface {0} is no longer valid")]
    InvalidSurface(OutputSurface),

    /// The GPU context was invalidated; a new context must be built.
    #[error("GPU context lost: {0}")]
    ContextLost(String),

    /// API misuse; the current render pass is aborted.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// The effect step failed for one target on one frame.
    #[error("effect failed: {0}")]
    EffectFailure(String),

    /// Transient backend condition; the target is retried on the next frame.
    #[error("frame dropped: {0}")]
    FrameDropped(String),

    /// The capture collaborator delivered a frame that is not newer than the last one.
    #[error("frame timestamp {current:?} does not advance past {previous:?}")]
    FrameOrder { previous: Duration, current: Duration },

    /// The render thread has shut down and no longer accepts requests.
    #[error("render thread has been released")]
    Released,

    /// The GPU backend could not be constructed.
    #[error("GPU initialization failed: {0}")]
    Init(String),
}

impl RenderError {
    /// Returns `true` when the error must stop the render loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::ContextLost(_) | RenderError::PreconditionViolation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_context_and_precondition_errors_are_fatal() {
        assert!(RenderError::ContextLost("gone".into()).is_fatal());
        assert!(RenderError::PreconditionViolation("bad".into()).is_fatal());

        assert!(!RenderError::NotFound(TargetId::preview()).is_fatal());
        assert!(!RenderError::EffectFailure("shader".into()).is_fatal());
        assert!(!RenderError::FrameDropped("timeout".into()).is_fatal());
        assert!(!RenderError::Released.is_fatal());
    }

    #[test]
    fn frame_order_message_names_both_timestamps() {
        let err = RenderError::FrameOrder {
            previous: Duration::from_millis(40),
            current: Duration::from_millis(20),
        };
        let msg = err.to_string();
        assert!(msg.contains("40ms"));
        assert!(msg.contains("20ms"));
    }
}
