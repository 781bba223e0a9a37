use super::{
    BindingRelease, OutputSurface, Registration, SurfaceHandle, SurfaceRegistry, TargetId, TargetOptions,
};
use crate::error::Result;

/// Notification from the hosting lifecycle about one output target.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// `options: None` keeps the options of a re-created target, or uses the
    /// defaults for its name.
    Created {
        id: TargetId,
        surface: OutputSurface,
        options: Option<TargetOptions>,
    },
    Changed { id: TargetId, width: i32, height: i32 },
    Destroyed { id: TargetId },
}

impl SurfaceEvent {
    pub fn created(id: impl Into<TargetId>, handle: SurfaceHandle, width: i32, height: i32) -> Self {
        SurfaceEvent::Created {
            id: id.into(),
            surface: OutputSurface::new(handle, width, height),
            options: None,
        }
    }

    pub fn created_with(
        id: impl Into<TargetId>,
        handle: SurfaceHandle,
        width: i32,
        height: i32,
        options: TargetOptions,
    ) -> Self {
        SurfaceEvent::Created {
            id: id.into(),
            surface: OutputSurface::new(handle, width, height),
            options: Some(options),
        }
    }

    pub fn changed(id: impl Into<TargetId>, width: i32, height: i32) -> Self {
        SurfaceEvent::Changed {
            id: id.into(),
            width,
            height,
        }
    }

    pub fn destroyed(id: impl Into<TargetId>) -> Self {
        SurfaceEvent::Destroyed { id: id.into() }
    }

    pub fn target(&self) -> &TargetId {
        match self {
            SurfaceEvent::Created { id, .. }
            | SurfaceEvent::Changed { id, .. }
            | SurfaceEvent::Destroyed { id } => id,
        }
    }
}

/// What a lifecycle event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Registered(Registration),
    Removed(Option<OutputSurface>),
}

impl SurfaceRegistry {
    /// Maps a lifecycle notification onto `register`/`unregister`.
    ///
    /// `Changed` keeps the current handle and produces a new value with the
    /// reported size; `NotFound` if the target was never created. A change to
    /// a degenerate size removes the target.
    pub fn apply_event<R>(&mut self, event: SurfaceEvent, bindings: &mut R) -> Result<LifecycleOutcome>
    where
        R: BindingRelease + ?Sized,
    {
        match event {
            SurfaceEvent::Created { id, surface, options } => {
                let registration = match options {
                    Some(options) => self.register_with(id, surface, options, bindings)?,
                    None => self.register(id, surface, bindings)?,
                };
                Ok(LifecycleOutcome::Registered(registration))
            }

            SurfaceEvent::Changed { id, width, height } => {
                let resized = self.get(&id)?.resized(width, height);
                if !resized.is_renderable() {
                    log::info!("`{id}` changed to degenerate size {width}x{height}; removing target");
                    return Ok(LifecycleOutcome::Removed(self.unregister(&id, bindings)));
                }
                self.register(id, resized, bindings)
                    .map(LifecycleOutcome::Registered)
            }

            SurfaceEvent::Destroyed { id } => {
                Ok(LifecycleOutcome::Removed(self.unregister(&id, bindings)))
            }
        }
    }
}
