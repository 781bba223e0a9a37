//! Output surfaces and the registry of live targets.
//!
//! An [`OutputSurface`] is an immutable (handle, width, height) value. The
//! [`SurfaceRegistry`] maps logical target names to the latest value and asks
//! the GPU side to release bindings of values it displaces.

mod handle;
mod lifecycle;
mod options;
mod output;
mod registry;
mod target;
mod viewport;

pub use handle::SurfaceHandle;
pub use lifecycle::{LifecycleOutcome, SurfaceEvent};
pub use options::{TargetOptions, MIRROR_HORIZONTAL};
pub use output::OutputSurface;
pub use registry::{ActiveTargets, BindingRelease, RegisteredTarget, Registration, SurfaceRegistry};
pub use target::TargetId;
pub use viewport::Viewport;
