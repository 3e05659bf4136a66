//! Logging setup.

mod logging;

pub use logging::{setup_logging, LogGuard};
