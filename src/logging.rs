use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber once. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // Another subscriber may already be installed (e.g. by a host app)
        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}
