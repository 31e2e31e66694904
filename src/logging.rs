use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "SHELFMARK_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "shelfmark_lib=debug,info"
    } else {
        "shelfmark_lib=info,warn"
    }
}

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
