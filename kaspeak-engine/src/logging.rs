use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log threshold
/// (`trace|debug|info|warn|error`).
pub const LOG_LEVEL_ENV: &str = "KASPEAK_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "warn";

static INIT: Once = Once::new();

/// Installs the global tracing subscriber, honouring `KASPEAK_LOG_LEVEL`.
///
/// Idempotent, and a no-op when the host application already installed a
/// subscriber of its own.
pub fn init() {
    INIT.call_once(|| {
        let level =
            std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        let filter =
            EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
