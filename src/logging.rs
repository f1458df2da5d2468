/// Diagnostic logging to stderr via `tracing`.
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins when set; otherwise
/// `--verbose` enables debug output for this crate and the default is warnings only.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "actpin=debug" } else { "actpin=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_err| return EnvFilter::new(default_directive));

    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    return;
}
