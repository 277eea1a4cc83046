//! In-memory implementation of the mydas-query DataSource trait
//!
//! The whole data set is held in memory, loaded from a YAML fixture. It is
//! the backend used for demos and tests, and serves as a reference for what
//! each [`Capability`] obliges a source to implement.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mydas_memory::MemorySource;
//!
//! # fn example() -> mydas_query::Result<()> {
//! let source = MemorySource::from_file("fixtures/demo.yaml")?;
//! # Ok(())
//! # }
//! ```

mod fixture;

pub use fixture::{Fixture, FixtureSegment};

use async_trait::async_trait;
use mydas_core::{CacheGroupHandle, DataSourceConfig};
use mydas_query::{
    AnnotatedSegment, Capability, DataError, DataSource, DataSourceFactory, EntryPoint,
    FeatureType, LinkField, Result, Sequence,
};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Backend type name used in configuration files
pub const MEMORY_BACKEND: &str = "memory";

/// Data source serving a [`Fixture`] from memory
pub struct MemorySource {
    fixture: RwLock<Fixture>,
    cache: RwLock<Option<CacheGroupHandle>>,
    retrievals: AtomicUsize,
}

impl MemorySource {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            cache: RwLock::new(None),
            retrievals: AtomicUsize::new(0),
        }
    }

    /// Load the fixture at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Fixture::from_file(path)?))
    }

    /// Replace the served content and empty this source's cached results
    pub fn replace_fixture(&self, fixture: Fixture) -> Result<()> {
        fixture.validate()?;
        *self.fixture.write() = fixture;

        if let Some(cache) = self.cache.read().as_ref() {
            let flushed = cache.empty_cache();
            debug!("Fixture replaced, flushed {} cached results", flushed);
        }
        Ok(())
    }

    /// Number of feature, sequence, type, count and link retrievals served
    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
    }

    fn check_range(segment: &FixtureSegment, start: u64, stop: u64) -> Result<()> {
        if start < 1 || stop > segment.len() || start > stop {
            return Err(DataError::coordinate_error(
                &segment.id,
                format!(
                    "Requested range {}-{} lies outside 1-{}",
                    start,
                    stop,
                    segment.len()
                ),
            ));
        }
        Ok(())
    }

    fn annotated_segment(
        fixture: &Fixture,
        segment: &FixtureSegment,
        range: Option<(u64, u64)>,
    ) -> AnnotatedSegment {
        let (start, stop) = range.unwrap_or((1, segment.len()));
        let features = segment
            .features
            .iter()
            .filter(|f| range.is_none() || !f.is_positional() || (f.stop >= start && f.start <= stop))
            .cloned()
            .collect();

        AnnotatedSegment {
            segment_id: segment.id.clone(),
            start,
            stop,
            version: fixture.version.clone(),
            label: segment.label.clone(),
            segment_type: segment.segment_type.clone(),
            features,
        }
    }

    fn sequence_of(
        fixture: &Fixture,
        segment: &FixtureSegment,
        range: Option<(u64, u64)>,
    ) -> Result<Sequence> {
        let residues = segment.sequence.as_deref().ok_or_else(|| {
            DataError::data_source(format!("Segment {} has no sequence", segment.id))
        })?;

        let (start, stop) = range.unwrap_or((1, segment.len()));
        let slice = residues
            .get((start - 1) as usize..stop as usize)
            .ok_or_else(|| DataError::coordinate_error(&segment.id, "Range outside sequence"))?;

        Ok(Sequence {
            segment_id: segment.id.clone(),
            start,
            version: fixture.version.clone(),
            molecule_type: segment.molecule_type,
            residues: slice.to_string(),
        })
    }

    fn require_reference(fixture: &Fixture) -> Result<()> {
        if fixture.reference {
            Ok(())
        } else {
            Err(DataError::unimplemented(
                "this in-memory source is an annotation source",
            ))
        }
    }

    fn require_range_handling(fixture: &Fixture) -> Result<()> {
        if fixture.range_handling {
            Ok(())
        } else {
            Err(DataError::unimplemented(
                "this in-memory source does not handle ranges",
            ))
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn source_type(&self) -> &'static str {
        MEMORY_BACKEND
    }

    fn capabilities(&self) -> Vec<Capability> {
        let fixture = self.fixture.read();
        let mut capabilities = vec![Capability::Annotation];
        if fixture.reference {
            capabilities.push(Capability::Reference);
        }
        if fixture.range_handling {
            capabilities.push(Capability::RangeHandling);
        }
        capabilities
    }

    fn register_cache(&self, cache: CacheGroupHandle) {
        *self.cache.write() = Some(cache);
    }

    async fn features(&self, segment_id: &str) -> Result<Option<AnnotatedSegment>> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        Ok(fixture
            .segment(segment_id)
            .map(|segment| Self::annotated_segment(&fixture, segment, None)))
    }

    async fn features_in_range(
        &self,
        segment_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Option<AnnotatedSegment>> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        Self::require_range_handling(&fixture)?;

        let Some(segment) = fixture.segment(segment_id) else {
            return Err(DataError::bad_reference(segment_id, "Segment cannot be found."));
        };
        Self::check_range(segment, start, stop)?;
        Ok(Some(Self::annotated_segment(
            &fixture,
            segment,
            Some((start, stop)),
        )))
    }

    async fn features_by_id(
        &self,
        feature_ids: &[String],
        group_ids: &[String],
    ) -> Result<Option<Vec<AnnotatedSegment>>> {
        self.record_retrieval();
        let fixture = self.fixture.read();

        let segments: Vec<AnnotatedSegment> = fixture
            .segments
            .iter()
            .filter_map(|segment| {
                let mut annotated = Self::annotated_segment(&fixture, segment, None);
                annotated.features.retain(|feature| {
                    feature_ids.contains(&feature.id)
                        || feature.groups.iter().any(|g| group_ids.contains(&g.id))
                });
                (!annotated.features.is_empty()).then_some(annotated)
            })
            .collect();

        Ok(Some(segments))
    }

    async fn types(&self) -> Result<Vec<FeatureType>> {
        self.record_retrieval();
        Ok(self.fixture.read().type_catalogue())
    }

    async fn total_count_for_type(&self, feature_type: &FeatureType) -> Result<Option<u64>> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        if !fixture.count_types {
            return Ok(None);
        }

        let count = fixture
            .segments
            .iter()
            .flat_map(|s| s.features.iter())
            .filter(|f| &f.feature_type() == feature_type)
            .count();
        Ok(Some(count as u64))
    }

    async fn link_url(&self, field: LinkField, id: &str) -> Result<Url> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        let template = fixture.link_template.as_deref().ok_or_else(|| {
            DataError::unimplemented("no link template configured for this source")
        })?;

        let url = template
            .replace("{field}", field.as_str())
            .replace("{id}", id);
        Url::parse(&url)
            .map_err(|e| DataError::data_source(format!("Invalid link URL {}: {}", url, e)))
    }

    async fn sequence(&self, segment_id: &str) -> Result<Option<Sequence>> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        Self::require_reference(&fixture)?;

        match fixture.segment(segment_id) {
            Some(segment) => Self::sequence_of(&fixture, segment, None).map(Some),
            None => Ok(None),
        }
    }

    async fn sequence_in_range(
        &self,
        segment_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Option<Sequence>> {
        self.record_retrieval();
        let fixture = self.fixture.read();
        Self::require_reference(&fixture)?;
        Self::require_range_handling(&fixture)?;

        let Some(segment) = fixture.segment(segment_id) else {
            return Err(DataError::bad_reference(segment_id, "Segment cannot be found."));
        };
        Self::check_range(segment, start, stop)?;
        Self::sequence_of(&fixture, segment, Some((start, stop))).map(Some)
    }

    async fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        let fixture = self.fixture.read();
        Self::require_reference(&fixture)?;
        Ok(fixture.segments.iter().map(FixtureSegment::entry_point).collect())
    }

    async fn entry_point_version(&self) -> Result<Option<String>> {
        let fixture = self.fixture.read();
        Self::require_reference(&fixture)?;
        Ok(fixture.entry_point_version.clone())
    }
}

/// Factory creating [`MemorySource`]s from the `fixture` option
pub struct MemorySourceFactory;

impl DataSourceFactory for MemorySourceFactory {
    fn backend_type(&self) -> &'static str {
        MEMORY_BACKEND
    }

    fn create_source(&self, config: &DataSourceConfig) -> Result<Arc<dyn DataSource>> {
        let path = config.options.get("fixture").ok_or_else(|| {
            DataError::invalid_configuration(format!(
                "Data source {} needs a 'fixture' option",
                config.id
            ))
        })?;

        debug!("Loading fixture {} for data source {}", path, config.id);
        Ok(Arc::new(MemorySource::from_file(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mydas_core::CacheCoordinator;
    use mydas_query::Feature;
    use std::io::Write;

    fn fixture(reference: bool, range_handling: bool) -> Fixture {
        Fixture {
            reference,
            range_handling,
            entry_point_version: Some("38".to_string()),
            link_template: Some("http://example.org/{field}/{id}".to_string()),
            segments: vec![
                FixtureSegment::new("chr1", 0)
                    .with_sequence("ACGTACGTACGTACGTACGT")
                    .with_feature(Feature::new("e1", "exon", 2, 5))
                    .with_feature(Feature::new("e2", "exon", 12, 15))
                    .with_feature(Feature::new("n1", "note", 0, 0)),
                FixtureSegment::new("chr2", 50),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_capabilities_follow_fixture() {
        let source = MemorySource::new(fixture(true, false));
        assert!(source.supports(Capability::Annotation));
        assert!(source.supports(Capability::Reference));
        assert!(!source.supports(Capability::RangeHandling));
    }

    #[tokio::test]
    async fn test_features_unknown_segment_is_none() {
        let source = MemorySource::new(fixture(false, false));
        assert!(source.features("chr9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_features_in_range() {
        let source = MemorySource::new(fixture(false, true));
        let segment = source.features_in_range("chr1", 1, 10).await.unwrap().unwrap();
        assert_eq!(segment.start, 1);
        assert_eq!(segment.stop, 10);
        let ids: Vec<&str> = segment.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "n1"]);

        assert!(matches!(
            source.features_in_range("chr1", 5, 25).await,
            Err(DataError::CoordinateError { .. })
        ));
        assert!(matches!(
            source.features_in_range("chr9", 1, 2).await,
            Err(DataError::BadReferenceObject { .. })
        ));
    }

    #[tokio::test]
    async fn test_sequence_requires_reference() {
        let annotation = MemorySource::new(fixture(false, false));
        assert!(matches!(
            annotation.sequence("chr1").await,
            Err(DataError::UnimplementedFeature(_))
        ));

        let reference = MemorySource::new(fixture(true, true));
        let sequence = reference.sequence_in_range("chr1", 3, 6).await.unwrap().unwrap();
        assert_eq!(sequence.residues, "GTAC");
        assert_eq!(sequence.start, 3);
        assert_eq!(sequence.stop(), 6);
    }

    #[tokio::test]
    async fn test_sequence_missing_residues() {
        let reference = MemorySource::new(fixture(true, false));
        assert!(matches!(
            reference.sequence("chr2").await,
            Err(DataError::DataSource(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_points() {
        let source = MemorySource::new(fixture(true, false));
        let entry_points = source.entry_points().await.unwrap();
        assert_eq!(entry_points.len(), 2);
        assert_eq!(entry_points[0].stop, 20);
        assert_eq!(
            source.entry_point_version().await.unwrap().as_deref(),
            Some("38")
        );
    }

    #[tokio::test]
    async fn test_type_counts_are_optional() {
        let mut with_counts = fixture(false, false);
        with_counts.count_types = true;
        let source = MemorySource::new(with_counts);
        assert_eq!(
            source
                .total_count_for_type(&FeatureType::new("exon"))
                .await
                .unwrap(),
            Some(2)
        );

        let source = MemorySource::new(fixture(false, false));
        assert_eq!(
            source
                .total_count_for_type(&FeatureType::new("exon"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_link_url() {
        let source = MemorySource::new(fixture(false, false));
        let url = source.link_url(LinkField::Feature, "e1").await.unwrap();
        assert_eq!(url.as_str(), "http://example.org/feature/e1");
    }

    #[tokio::test]
    async fn test_features_by_id() {
        let source = MemorySource::new(fixture(false, false));
        let segments = source
            .features_by_id(&["e2".to_string()], &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment_id, "chr1");
        assert_eq!(segments[0].features.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_fixture_empties_cache() {
        let cache = Arc::new(CacheCoordinator::new());
        let source = MemorySource::new(fixture(false, false));
        source.register_cache(cache.group_handle("demo"));

        let _: Arc<u32> = cache
            .get_or_compute("demo_X", "demo", || async { Ok::<_, ()>(1) })
            .await
            .unwrap();
        assert!(cache.contains("demo_X"));

        source.replace_fixture(fixture(true, false)).unwrap();
        assert!(!cache.contains("demo_X"));
        assert!(source.supports(Capability::Reference));
    }

    #[test]
    fn test_factory_requires_fixture_option() {
        let config = DataSourceConfig::new("demo", MEMORY_BACKEND);
        assert!(matches!(
            MemorySourceFactory.create_source(&config),
            Err(DataError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_factory_loads_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "segments:\n  - id: chr1\n    length: 100").unwrap();

        let config = DataSourceConfig::new("demo", MEMORY_BACKEND)
            .with_option("fixture", file.path().to_string_lossy());
        let source = MemorySourceFactory.create_source(&config).unwrap();
        assert_eq!(source.source_type(), MEMORY_BACKEND);
        assert!(source.downcast_ref::<MemorySource>().is_some());
    }
}
