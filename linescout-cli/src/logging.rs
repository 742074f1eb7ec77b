use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Logs always go to stderr so stdout stays free for results and for the
/// stdio protocol. `RUST_LOG` takes precedence over `default_level`.
pub fn init(default_level: &str, ansi: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "linescout={default_level},linescout_cli={default_level}"
        ))
    });

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .compact()
        .try_init();
}
