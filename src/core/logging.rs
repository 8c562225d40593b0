//! Logging initialization and utilities

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// marchland::core::logging::init();
/// log::info!("Terrain streaming started");
/// ```
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();
}
