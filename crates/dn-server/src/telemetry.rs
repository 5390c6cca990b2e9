//! Logging bootstrap

use crate::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Filter from `RUST_LOG`, falling back to the configured level
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn stderr_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    if json {
        Box::new(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        )
    } else {
        Box::new(fmt::layer().compact().with_writer(std::io::stderr).with_target(true))
    }
}

/// Install the global subscriber
///
/// Returns false if one was already installed (tests, embedding hosts).
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(stderr_layer(config.json))
        .with(filter(&config.level))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back() {
        // Must not panic on garbage directives.
        let _ = filter("not a [valid directive");
    }
}
