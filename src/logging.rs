//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "depshift=debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over `--verbose`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
