use super::{build_registry, load_config};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct CheckCommand {
    /// Server configuration file (YAML or JSON)
    #[arg(long, env = "MYDAS_CONFIG")]
    pub config: PathBuf,
}

impl CheckCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = load_config(&self.config)?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let registry = build_registry(&config).await?;
            info!(
                "Registered backends: {}",
                registry.list_backends().await.join(", ")
            );
            for loaded in registry.list().await {
                info!(
                    "Data source {} ({}) capabilities: {:?}",
                    loaded.id(),
                    loaded.config.backend,
                    loaded.source.capabilities()
                );
            }
            registry.close_all().await;
            anyhow::Ok(())
        })?;

        info!("Configuration {} is valid", self.config.display());
        Ok(())
    }
}
