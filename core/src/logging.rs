//! Logging setup for native hosts and the CLI
//!
//! The library itself only emits `tracing` events. Hosts call one of these
//! once at startup; the wasm crate installs `tracing-wasm` instead.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name prefix for the rolling appender
const LOG_FILE_PREFIX: &str = "bgmode.log";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a stderr subscriber. `RUST_LOG` wins over `fallback_filter`.
///
/// Returns false when a global subscriber was already installed.
pub fn init_logging(fallback_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback_filter))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes to stderr and to a daily-rolling file
/// in `dir`. Keep the returned guard alive until shutdown so buffered lines
/// are flushed.
pub fn init_file_logging(dir: impl AsRef<Path>, fallback_filter: &str) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(dir.as_ref(), LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(env_filter(fallback_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .is_ok();

    installed.then_some(guard)
}
