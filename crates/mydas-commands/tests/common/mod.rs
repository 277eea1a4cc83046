//! Shared fixtures for the command layer integration tests
//!
//! - an annotation source that handles ranges and counts types
//! - a reference source without range handling, with five entry points
//! - a source whose first retrievals fail, to exercise cache rollback

#![allow(dead_code)]

use async_trait::async_trait;
use mydas_commands::CommandManager;
use mydas_core::{CacheCoordinator, DataSourceConfig, GlobalConfig};
use mydas_memory::{Fixture, FixtureSegment, MemorySource};
use mydas_query::{
    AnnotatedSegment, Capability, DataError, DataSource, DataSourceFactory, DataSourceRegistry,
    Feature, FeatureType, LoadedSource, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const FIXTURE_BACKEND: &str = "fixture";
pub const FLAKY_BACKEND: &str = "flaky";

/// Creates memory sources from fixtures held in memory, keyed by source id
pub struct FixtureFactory {
    fixtures: HashMap<String, Fixture>,
}

impl DataSourceFactory for FixtureFactory {
    fn backend_type(&self) -> &'static str {
        FIXTURE_BACKEND
    }

    fn create_source(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSource>> {
        let fixture = self.fixtures.get(&config.id).cloned().ok_or_else(|| {
            DataError::invalid_configuration(format!("no fixture for {}", config.id))
        })?;
        Ok(Arc::new(MemorySource::new(fixture)))
    }
}

/// Annotation source failing its first `failures` feature retrievals
pub struct FlakySource {
    failures: usize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl DataSource for FlakySource {
    fn source_type(&self) -> &'static str {
        FLAKY_BACKEND
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Annotation]
    }

    async fn features(&self, segment_id: &str) -> Result<Option<AnnotatedSegment>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(DataError::data_source("backend unavailable"));
        }
        Ok(Some(AnnotatedSegment {
            segment_id: segment_id.to_string(),
            start: 1,
            stop: 100,
            version: "1".to_string(),
            label: None,
            segment_type: None,
            features: vec![Feature::new("f1", "exon", 10, 20)],
        }))
    }

    async fn types(&self) -> Result<Vec<FeatureType>> {
        Ok(vec![FeatureType::new("exon")])
    }
}

pub struct FlakyFactory {
    pub failures: usize,
}

impl DataSourceFactory for FlakyFactory {
    fn backend_type(&self) -> &'static str {
        FLAKY_BACKEND
    }

    fn create_source(&self, _config: &DataSourceConfig) -> Result<Arc<dyn DataSource>> {
        Ok(Arc::new(FlakySource {
            failures: self.failures,
            calls: AtomicUsize::new(0),
        }))
    }
}

fn feature(id: &str, type_id: &str, start: u64, stop: u64) -> Feature {
    Feature::new(id, type_id, start, stop)
}

/// Range-handling annotation source
pub fn annotation_fixture() -> Fixture {
    let mut grouped = feature("e3", "exon", 10, 20);
    grouped.groups.push(mydas_query::FeatureGroup {
        id: "g1".to_string(),
        label: Some("transcript 1".to_string()),
        group_type: None,
        notes: Vec::new(),
        links: Vec::new(),
    });

    let mut labelled = feature("e2", "exon", 300, 400);
    labelled.label = Some("second exon".to_string());

    Fixture {
        version: "7".to_string(),
        range_handling: true,
        count_types: true,
        link_template: Some("http://example.org/{field}?id={id}".to_string()),
        types: Some(vec![
            FeatureType::new("exon"),
            FeatureType::new("intron"),
            FeatureType::new("cds"),
        ]),
        segments: vec![
            FixtureSegment::new("chr1", 1000)
                .with_feature(feature("e1", "exon", 150, 160))
                .with_feature(feature("i1", "intron", 161, 299))
                .with_feature(labelled),
            FixtureSegment::new("chr2", 500).with_feature(grouped),
        ],
        ..Default::default()
    }
}

/// Reference source without range handling
pub fn reference_fixture() -> Fixture {
    Fixture {
        version: "38".to_string(),
        reference: true,
        entry_point_version: Some("GRCh38".to_string()),
        segments: vec![
            FixtureSegment::new("chr1", 0)
                .with_sequence("ACGTACGTACGTACGTACGT")
                .with_feature(feature("e1", "exon", 2, 5)),
            FixtureSegment::new("chr2", 200),
            FixtureSegment::new("chr3", 300),
            FixtureSegment::new("chr4", 400),
            FixtureSegment::new("chr5", 500),
        ],
        ..Default::default()
    }
}

pub struct TestServer {
    pub manager: CommandManager,
    pub registry: Arc<DataSourceRegistry>,
}

impl TestServer {
    pub async fn get(&self, id: &str) -> Arc<LoadedSource> {
        self.registry.get(id).await.expect("source is loaded")
    }

    /// Retrievals served so far by the memory source `id`
    pub async fn retrievals(&self, id: &str) -> usize {
        let loaded = self.get(id).await;
        loaded
            .source
            .downcast_ref::<MemorySource>()
            .expect("memory source")
            .retrievals()
    }
}

/// Manager serving `annot` (annotation), `ref` (reference) and `flaky`
pub async fn test_server(global: GlobalConfig, configure: impl Fn(&mut DataSourceConfig)) -> TestServer {
    let registry = Arc::new(DataSourceRegistry::new(Arc::new(CacheCoordinator::new())));

    let fixtures = HashMap::from([
        ("annot".to_string(), annotation_fixture()),
        ("ref".to_string(), reference_fixture()),
    ]);
    registry
        .register_factory(Arc::new(FixtureFactory { fixtures }))
        .await;
    registry
        .register_factory(Arc::new(FlakyFactory { failures: 1 }))
        .await;

    for (id, backend) in [
        ("annot", FIXTURE_BACKEND),
        ("ref", FIXTURE_BACKEND),
        ("flaky", FLAKY_BACKEND),
    ] {
        let mut config = DataSourceConfig::new(id, backend);
        config.version = Some(format!("{}-v1", id));
        configure(&mut config);
        registry.add_source(config).await.expect("source loads");
    }

    TestServer {
        manager: CommandManager::new(registry.clone(), global),
        registry,
    }
}

pub async fn default_server() -> TestServer {
    test_server(GlobalConfig::default(), |_| {}).await
}
