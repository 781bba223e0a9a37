//! Frames coming from the camera side and their handoff to the render thread.

mod channel;
mod frame;

pub use channel::{frame_channel, DeliveryPolicy, FrameReceiver, FrameSender, Recv, DEFAULT_FRAME_QUEUE};
pub use frame::{CameraFrame, IDENTITY_TRANSFORM};
