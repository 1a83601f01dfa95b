//! Logging initialization.

/// Initialize the logging system.
///
/// Uses env_logger with a default filter level of `info` and millisecond
/// timestamps. Override with the `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// terrain_forge::logging::init();
/// log::info!("Converter started");
/// ```
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

