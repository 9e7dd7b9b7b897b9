//! Logging initialisation.
//!
//! Structured logging through `tracing`. The filter comes from `RUST_LOG`
//! when set, otherwise from the default passed by the caller. Timestamps
//! are local-time RFC 3339.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// Initialises console logging.
///
/// `default_filter` is used when `RUST_LOG` is unset, e.g. `"vayumap=info"`.
/// Safe to call once per process; later calls are ignored.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .try_init();
}

/// Initialises logging to a daily-rotated file in `directory`.
///
/// Returns the appender guard; dropping it flushes and stops the writer
/// thread, so hold it for the life of the process.
pub fn init_with_file(default_filter: &str, directory: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let appender = tracing_appender::rolling::daily(directory, "vayumap.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::rfc_3339())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    guard
}
