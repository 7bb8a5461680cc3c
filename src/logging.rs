//! Tracing setup shared by the binaries.

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LoggingConfig;

/// Build the env filter: `RUST_LOG` wins, then the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "crmdesk={level},tower_http={level}",
            level = config.level
        ))
    })
}

/// Subscriber for the window before the config is loaded. Scope it with
/// `tracing::subscriber::with_default` so config warnings reach stderr.
pub fn bootstrap() -> impl Subscriber + Send + Sync {
    bootstrap_with(std::io::stderr)
}

fn bootstrap_with<W>(writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&LoggingConfig::default()))
        .with_writer(writer)
        .finish()
}

/// Install the global subscriber. `format = "json"` selects structured
/// output; anything else is human-readable.
pub fn init(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}
