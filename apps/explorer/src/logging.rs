use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` or `warn`.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("niche_explorer={default_level}")));

    // A second install (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
