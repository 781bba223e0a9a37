//! GPU context and backends.
//!
//! [`GpuContext`] is the state machine every bind and present goes through.
//! It drives a [`GpuBackend`]:
//! - [`WgpuBackend`] creates swap chains on native surfaces through wgpu
//! - [`HeadlessBackend`] records calls and injects faults, for tests and
//!   machines without a GPU

mod backend;
mod context;
mod gpu;
mod headless;
mod init;
mod surface;

pub use backend::{BackendError, GpuBackend};
pub use context::{ContextState, GpuContext};
pub use gpu::{WgpuBackend, WgpuPass};
pub use headless::{BackendCall, HeadlessBackend, HeadlessJournal, HeadlessPass};
pub use init::GpuInit;
