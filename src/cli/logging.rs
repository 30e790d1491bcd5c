use tracing_subscriber::EnvFilter;

const CRATE_TARGET: &str = "rainfall_raster";

/// Install the fmt subscriber.
///
/// Verbosity 0 logs warnings, 1 info, 2 debug, 3+ trace. `RUST_LOG`
/// overrides the flag when set.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{CRATE_TARGET}={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
