//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default filter
///
/// `RUST_LOG` still wins when it is set. Repeated calls are ignored so tests
/// and embedding applications can both call this safely.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter.to_owned());
    let _ = env_logger::Builder::from_env(env).try_init();
}
