//! Frame rendering.
//!
//! `RenderLoop` drives one frame at a time across every registered target:
//! bind the target, run the effect, present. `RenderThread` hosts a loop on a
//! dedicated thread and serializes surface lifecycle events with frames.
//!
//! Convention:
//! - Effects only ever see the target that is currently bound.
//! - A failure on one target never skips the others for the same frame.
//! - Latest-wins targets may skip a frame a newer one already replaced;
//!   lossless targets (`record` by default) see every frame.

mod effect;
mod passthrough;
mod render_loop;
mod stats;
mod target;
mod thread;

pub use effect::{Effect, EffectError};
pub use passthrough::PassthroughEffect;
pub use render_loop::RenderLoop;
pub use stats::{FrameReport, RenderStats, TargetStats};
pub use target::RenderTarget;
pub use thread::{RenderHandle, RenderStatus, RenderSummary, RenderThread, RenderThreadConfig};
