//! Tracing setup shared by the binaries

use tracing::Dispatch;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is unset
pub fn default_directives(config: &LoggingConfig) -> String {
    format!("leadboard={},tower_http=info", config.level)
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. A second call is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}

/// Stderr subscriber for anything logged before the configured one exists
pub fn bootstrap_dispatch<W>(filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    Dispatch::new(
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(writer)),
    )
}

/// Run `f` (usually config loading) with the bootstrap subscriber active
pub fn with_bootstrap<T>(f: impl FnOnce() -> T) -> T {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&LoggingConfig::default())));
    let dispatch = bootstrap_dispatch(filter, std::io::stderr);
    tracing::dispatcher::with_default(&dispatch, f)
}
