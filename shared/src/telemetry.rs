use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes tracing with optional JSON formatting.
///
/// Configuration is driven by environment variables:
/// - `RUST_LOG` for log filtering
/// - `LOG_FORMAT=json` to switch to flattened JSON output
pub fn init_telemetry(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = Registry::default().with(env_filter);

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json().flatten_event(true);
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer();
        registry.with(fmt_layer).init();
    }

    tracing::debug!(service_name, "Telemetry initialized");
}
