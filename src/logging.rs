//! File logging. The terminal is owned by the UI, so nothing is ever
//! written to stdout or stderr.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "placemark-tui.log";

/// Installs the global subscriber: a daily rolling file under `logs/`,
/// filtered by `RUST_LOG` with INFO as the floor.
///
/// Dropping the returned guard flushes and stops the writer thread, so
/// `main` holds it until exit.
pub fn initialize_logging() -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("could not create {}/: {}", LOG_DIR, e);
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX));

    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "placemark-tui starting");
    guard
}
