use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install structured JSON logging on stderr.
/// `RUST_LOG` overrides `default_filter` (e.g. "info" or "care_session=debug").
/// Stdout is left to the command's own output.
pub fn init_telemetry(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .json();

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init();

    if result.is_err() {
        tracing::debug!("Telemetry was already initialized");
    }
}
