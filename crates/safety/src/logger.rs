//! Structured logger setup: console output plus a daily-rolling NDJSON file,
//! with level control through `RUST_LOG`.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "scriptwarden.log";

/// Install the global tracing subscriber. `level` is the fallback directive
/// when `RUST_LOG` is unset; the fallback keeps the `audit` target at `info`
/// or above so mirror events survive a quieter global level. Repeated calls
/// are no-ops.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},audit=info")));

    // NDJSON lines land in `<log_dir>/scriptwarden.log.YYYY-MM-DD`.
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    // Targets stay visible on the console so `audit` lines are
    // distinguishable from ordinary diagnostics.
    let console_layer = fmt::layer().with_writer(std::io::stdout).with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
