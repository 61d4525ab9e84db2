//! Logging setup shared by keyqueue binaries.
//!
//! Output goes to stdout through `tracing-subscriber`. Format and filter come
//! from the environment (see [`LogConfig::from_env`]).

pub mod logging;

pub use logging::{FORMAT_VAR, LogConfig, LogFormat, LogFormatError};

/// Initialize process-wide logging from the environment.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// Returns whether this call installed it.
pub fn init() -> bool {
    logging::init_with(&LogConfig::from_env())
}
