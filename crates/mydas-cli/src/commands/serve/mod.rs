mod shutdown;

use super::{build_registry, load_config};
use clap::Args;
use mydas_commands::CommandManager;
use mydas_server::{create_router, AppState};
use shutdown::shutdown_signal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:8080", env = "MYDAS_ADDRESS")]
    pub address: String,

    /// Server configuration file (YAML or JSON)
    #[arg(long, env = "MYDAS_CONFIG")]
    pub config: PathBuf,

    /// Seconds allowed for closing data sources on shutdown
    #[arg(long, default_value_t = 10, env = "MYDAS_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: u64,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = load_config(&self.config)?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async move {
            let registry = build_registry(&config).await?;
            let manager = Arc::new(CommandManager::new(registry.clone(), config.global.clone()));
            let router = create_router(AppState::new(manager));

            let listener = tokio::net::TcpListener::bind(&self.address).await?;
            info!(
                "Serving {} data sources on http://{}/das/",
                registry.list().await.len(),
                self.address
            );

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            shutdown::close_sources(registry, Duration::from_secs(self.shutdown_timeout)).await;
            anyhow::Ok(())
        })
    }
}
