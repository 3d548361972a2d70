use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; passing `debug = true`
/// raises it to `debug` and also allows `RUST_LOG` to override the filter.
/// When debug logging is off the environment variable is ignored so a stray
/// `RUST_LOG` cannot flood the output mid-drawing.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
