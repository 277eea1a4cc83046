use mydas_query::DataSourceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}

/// Close every data source, giving up after `timeout`
pub async fn close_sources(registry: Arc<DataSourceRegistry>, timeout: Duration) {
    info!("Closing data sources...");

    match tokio::time::timeout(timeout, registry.close_all()).await {
        Ok(()) => info!("All data sources closed"),
        Err(_) => warn!(
            "Cleanup timeout exceeded ({:?}), forcing shutdown",
            timeout
        ),
    }
}
