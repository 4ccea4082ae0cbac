use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-filter subscriber.
///
/// Honors `RUST_LOG`; falls back to debug-level output for the assetflow
/// crates. Call once at process start.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "assetflow=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
