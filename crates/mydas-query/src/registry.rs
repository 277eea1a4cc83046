use crate::error::{DataError, Result};
use crate::traits::DataSource;
use mydas_core::{CacheCoordinator, DataSourceConfig, ServerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Factory trait for creating data sources from configurations
pub trait DataSourceFactory: Send + Sync {
    /// Get the backend type this factory handles
    fn backend_type(&self) -> &'static str;

    /// Create a data source from configuration
    fn create_source(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSource>>;
}

/// A successfully initialised data source together with its configuration
pub struct LoadedSource {
    pub config: DataSourceConfig,
    pub source: Arc<dyn DataSource>,
}

impl LoadedSource {
    pub fn id(&self) -> &str {
        &self.config.id
    }
}

/// Registry for managing data source factories and the loaded sources
///
/// Sources are kept in configuration order, which is the order the `dsn`
/// and `sources` commands report them in.
pub struct DataSourceRegistry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn DataSourceFactory>>>>,
    sources: Arc<RwLock<Vec<Arc<LoadedSource>>>>,
    cache: Arc<CacheCoordinator>,
}

impl DataSourceRegistry {
    pub fn new(cache: Arc<CacheCoordinator>) -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
            sources: Arc::new(RwLock::new(Vec::new())),
            cache,
        }
    }

    /// Cache shared by every loaded source
    pub fn cache(&self) -> &Arc<CacheCoordinator> {
        &self.cache
    }

    /// Register a factory for a backend type
    pub async fn register_factory(&self, factory: Arc<dyn DataSourceFactory>) {
        let backend = factory.backend_type();
        let mut factories = self.factories.write().await;

        if factories.contains_key(backend) {
            warn!("Overwriting existing factory for backend: {}", backend);
        }

        factories.insert(backend.to_string(), factory);
        debug!("Registered factory for backend: {}", backend);
    }

    /// Create one data source and add it to the registry
    pub async fn add_source(&self, config: DataSourceConfig) -> Result<Arc<LoadedSource>> {
        let factory = self
            .factories
            .read()
            .await
            .get(&config.backend)
            .cloned()
            .ok_or_else(|| {
                DataError::invalid_configuration(format!(
                    "No factory registered for backend: {}",
                    config.backend
                ))
            })?;

        debug!(
            "Creating data source {} for backend: {}",
            config.id, config.backend
        );

        let source = factory.create_source(&config)?;
        source.register_cache(self.cache.group_handle(config.cache_group()));

        let loaded = Arc::new(LoadedSource { config, source });

        let mut sources = self.sources.write().await;
        if let Some(existing) = sources.iter_mut().find(|s| s.id() == loaded.id()) {
            warn!("Replacing data source: {}", loaded.id());
            self.cache.flush_group(existing.config.cache_group());
            *existing = loaded.clone();
        } else {
            sources.push(loaded.clone());
        }

        Ok(loaded)
    }

    /// Create every data source in `config`.
    ///
    /// Sources that fail to initialise are skipped and never reported to
    /// clients. Returns the number of sources loaded.
    pub async fn load(&self, config: &ServerConfig) -> usize {
        let mut loaded = 0;
        for datasource in &config.datasources {
            match self.add_source(datasource.clone()).await {
                Ok(_) => {
                    info!("Initialised data source: {}", datasource.id);
                    loaded += 1;
                }
                Err(e) => {
                    warn!("Skipping data source {}: {}", datasource.id, e);
                }
            }
        }
        loaded
    }

    /// Get a loaded data source
    pub async fn get(&self, source_id: &str) -> Option<Arc<LoadedSource>> {
        let sources = self.sources.read().await;
        sources.iter().find(|s| s.id() == source_id).cloned()
    }

    /// All loaded sources in configuration order
    pub async fn list(&self) -> Vec<Arc<LoadedSource>> {
        self.sources.read().await.clone()
    }

    /// Remove a source, closing it and dropping its cached results
    pub async fn remove_source(&self, source_id: &str) -> Result<()> {
        let removed = {
            let mut sources = self.sources.write().await;
            let position = sources.iter().position(|s| s.id() == source_id);
            position.map(|index| sources.remove(index))
        };

        if let Some(loaded) = removed {
            debug!("Closing data source: {}", source_id);
            self.cache.flush_group(loaded.config.cache_group());
            loaded.source.close().await?;
        }

        Ok(())
    }

    /// Close every source
    pub async fn close_all(&self) {
        let mut sources = self.sources.write().await;

        for loaded in sources.drain(..) {
            if let Err(e) = loaded.source.close().await {
                warn!("Failed to close data source {}: {}", loaded.id(), e);
            }
        }
        self.cache.flush_all();
    }

    /// List registered backend types
    pub async fn list_backends(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        factories.keys().cloned().collect()
    }

    /// Check if a backend is registered
    pub async fn has_backend(&self, backend: &str) -> bool {
        let factories = self.factories.read().await;
        factories.contains_key(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatedSegment, Capability, FeatureType};
    use async_trait::async_trait;
    use mydas_core::CacheGroupHandle;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubSource {
        cache: Mutex<Option<CacheGroupHandle>>,
    }

    #[async_trait]
    impl DataSource for StubSource {
        fn source_type(&self) -> &'static str {
            "stub"
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::Annotation]
        }

        fn register_cache(&self, cache: CacheGroupHandle) {
            *self.cache.lock().unwrap() = Some(cache);
        }

        async fn features(&self, _segment_id: &str) -> Result<Option<AnnotatedSegment>> {
            Ok(None)
        }

        async fn types(&self) -> Result<Vec<FeatureType>> {
            Ok(Vec::new())
        }
    }

    struct StubFactory;

    impl DataSourceFactory for StubFactory {
        fn backend_type(&self) -> &'static str {
            "stub"
        }

        fn create_source(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSource>> {
            if config.options.contains_key("broken") {
                return Err(DataError::invalid_configuration("broken on purpose"));
            }
            Ok(Arc::new(StubSource::default()))
        }
    }

    fn registry() -> DataSourceRegistry {
        DataSourceRegistry::new(Arc::new(CacheCoordinator::new()))
    }

    #[tokio::test]
    async fn test_registry_creation() {
        let registry = registry();
        assert!(registry.list().await.is_empty());
        assert!(!registry.has_backend("stub").await);
    }

    #[tokio::test]
    async fn test_registered_backends() {
        let registry = registry();
        registry.register_factory(Arc::new(StubFactory)).await;

        assert_eq!(registry.list_backends().await, vec!["stub".to_string()]);
        assert!(registry.has_backend("stub").await);
        assert!(!registry.has_backend("postgres").await);
    }

    #[tokio::test]
    async fn test_load_skips_failing_sources() {
        let registry = registry();
        registry.register_factory(Arc::new(StubFactory)).await;

        let config = ServerConfig {
            global: Default::default(),
            datasources: vec![
                DataSourceConfig::new("first", "stub"),
                DataSourceConfig::new("broken", "stub").with_option("broken", "yes"),
                DataSourceConfig::new("unknown-backend", "postgres"),
                DataSourceConfig::new("second", "stub"),
            ],
        };

        assert_eq!(registry.load(&config).await, 2);
        let ids: Vec<String> = registry
            .list()
            .await
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(registry.get("broken").await.is_none());
    }

    #[tokio::test]
    async fn test_source_receives_its_cache_group() {
        let registry = registry();
        registry.register_factory(Arc::new(StubFactory)).await;
        let loaded = registry
            .add_source(DataSourceConfig::new("ensembl", "stub"))
            .await
            .unwrap();

        let stub = loaded.source.downcast_ref::<StubSource>().unwrap();
        let handle = stub.cache.lock().unwrap().clone().unwrap();
        assert_eq!(handle.group(), "ensembl");
    }

    #[tokio::test]
    async fn test_remove_source() {
        let registry = registry();
        registry.register_factory(Arc::new(StubFactory)).await;
        registry
            .add_source(DataSourceConfig::new("a", "stub"))
            .await
            .unwrap();

        registry.remove_source("a").await.unwrap();
        assert!(registry.get("a").await.is_none());
        registry.remove_source("a").await.unwrap();
    }
}
