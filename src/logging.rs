// Logging setup shared by both binaries
//
// RUST_LOG overrides the default filter. Events always go to stderr:
// the console's stdout is its command output.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for the console: quiet unless something is skipped
pub const CONSOLE_LEVEL: &str = "warn";

/// Default filter for the web server, request spans included
pub const WEB_LEVEL: &str = "info,tower_http=debug";

/// Install the global subscriber. A second call is a no-op.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
