//! Tracing/logging setup shared by binaries and tests.

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init();
}

/// Subscriber configuration (filters, output format).
pub mod subscriber;

pub use subscriber::{LogConfig, LogConfigError, LogFormat, init_with};
