//! Logging setup.
//!
//! Logs go to stderr through the shared [`Console`], so they print above the
//! live task table instead of being drawn over. Stdout stays free for the
//! agent processes, which inherit it. `RUST_LOG` controls the filter (default
//! `info`) and `LABEL_WORKER_LOG_FORMAT=json` switches to one JSON object per
//! line.

use tracing_subscriber::EnvFilter;

use crate::console::Console;

pub const LOG_FORMAT_ENV: &str = "LABEL_WORKER_LOG_FORMAT";

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| Console::stderr().writer())
        .with_target(false);

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
