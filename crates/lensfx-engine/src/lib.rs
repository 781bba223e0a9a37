//! LensFX engine crate.
//!
//! Rendering and surface-management core for camera effects: tracks the
//! output surfaces a host exposes, binds them one at a time on a GPU context,
//! and presents effect-processed camera frames to each of them.

pub mod capture;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod surface;
pub mod time;

pub use error::{RenderError, Result};
