//! Logging utilities.
//!
//! Installs `env_logger` behind the `log` facade. Render-thread lines can
//! carry the thread name so lifecycle events and frames line up.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
