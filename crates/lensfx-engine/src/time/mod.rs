//! Time subsystem.
//!
//! Frame timing is driven by the capture timestamps rather than the wall
//! clock, so it stays testable and matches what the camera actually delivered.
//! Intended usage:
//! - one `FrameTimeline` per render loop
//! - call `observe()` once per received frame to obtain `FrameTime`

mod frame_timeline;

pub use frame_timeline::{FrameTime, FrameTimeline};
