//! Global tracing subscriber setup.

use maintix_settings::{LogFormat, LoggingSettings};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter from `RUST_LOG` when set, else from the configured level.
///
/// An unparsable level falls back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to stderr.
///
/// Call once at startup. Later calls are no-ops.
pub fn init(settings: &LoggingSettings) {
    let filter = build_filter(&settings.level);
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match settings.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init(),
    };
}
