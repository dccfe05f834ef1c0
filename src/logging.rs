use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides `default_directive`.
pub fn init(default_directive: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);

    // A subscriber may already be installed by tests.
    let _ = if json {
        registry.with(fmt::layer().json().with_ansi(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
}
