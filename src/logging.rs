//! Tracing subscriber setup for binaries and tests embedding the core.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Variable holding the filter directives, e.g. `sortwise=debug`
pub const LOG_ENV: &str = "SORTWISE_LOG";

/// Install a stdout subscriber filtered by `SORTWISE_LOG` (default `info`).
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("[Logging] Subscriber installed");
    }
    installed
}
