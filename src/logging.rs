//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Sets up logging of the events reported by this crate.
///
/// Use the RUST_LOG environment variable to select what is logged.
///
/// E.g. to see the serials found locally and at the master:
///   RUST_LOG=domain_ixfr=INFO
///
/// Or to see every record read from a snapshot:
///   RUST_LOG=domain_ixfr::snapshot=TRACE
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}
