use tracing_subscriber::{fmt, EnvFilter};

/// Build the log filter: `RUST_LOG` wins, then `LOG_LEVEL`, then `default_level`.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed (e.g. a second call
/// from a test harness); the existing subscriber stays in place.
pub fn init_tracing(default_level: &str) -> bool {
    fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(true)
        .try_init()
        .is_ok()
}
