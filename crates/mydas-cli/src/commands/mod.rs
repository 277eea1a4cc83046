pub mod check;
pub mod serve;

pub use check::CheckCommand;
pub use serve::ServeCommand;

use anyhow::Context;
use mydas_core::{CacheCoordinator, ServerConfig};
use mydas_memory::MemorySourceFactory;
use mydas_query::DataSourceRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Option naming the fixture file of memory data sources
const FIXTURE_OPTION: &str = "fixture";

/// Load the server configuration, resolving relative fixture paths against
/// the directory holding the configuration file
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;

    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    for datasource in &mut config.datasources {
        if let Some(fixture) = datasource.options.get_mut(FIXTURE_OPTION) {
            let fixture_path = PathBuf::from(fixture.as_str());
            if fixture_path.is_relative() {
                *fixture = base.join(fixture_path).to_string_lossy().to_string();
            }
        }
    }
    Ok(config)
}

/// Registry with every built-in backend registered and the configured data
/// sources loaded
pub async fn build_registry(config: &ServerConfig) -> anyhow::Result<Arc<DataSourceRegistry>> {
    let registry = Arc::new(DataSourceRegistry::new(Arc::new(CacheCoordinator::new())));
    registry.register_factory(Arc::new(MemorySourceFactory)).await;

    let loaded = registry.load(config).await;
    if loaded == 0 {
        anyhow::bail!(
            "None of the {} configured data sources could be loaded",
            config.datasources.len()
        );
    }
    Ok(registry)
}
