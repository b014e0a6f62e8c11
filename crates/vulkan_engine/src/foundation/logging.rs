//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Uses `RUST_LOG` when set, otherwise logs at `info`. Calling this more than
/// once is harmless.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
