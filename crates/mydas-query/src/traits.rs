use crate::error::{DataError, Result};
use crate::types::*;
use async_trait::async_trait;
use downcast_rs::{impl_downcast, Downcast};
use mydas_core::CacheGroupHandle;
use url::Url;

/// Contract every data source plugin implements
///
/// Annotation retrieval is mandatory. Everything a reference source or a
/// range-handling source adds has a default body that reports
/// [`DataError::UnimplementedFeature`]; the server only calls those methods
/// when [`DataSource::capabilities`] advertises the matching [`Capability`].
///
/// A retrieval that returns `Ok(None)` is treated by the server exactly like
/// [`DataError::BadReferenceObject`].
#[async_trait]
pub trait DataSource: Send + Sync + Downcast {
    /// Get the type name of this data source
    fn source_type(&self) -> &'static str;

    /// Get all capabilities supported by this source
    fn capabilities(&self) -> Vec<Capability>;

    /// Check if a specific capability is supported
    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Receive the handle to this source's cache group.
    ///
    /// Sources whose content can change at runtime keep the handle and call
    /// [`CacheGroupHandle::empty_cache`] when it does.
    fn register_cache(&self, _cache: CacheGroupHandle) {}

    /// All features annotated on a segment
    async fn features(&self, segment_id: &str) -> Result<Option<AnnotatedSegment>>;

    /// Features restricted to `[start, stop]` (range-handling sources)
    async fn features_in_range(
        &self,
        segment_id: &str,
        _start: u64,
        _stop: u64,
    ) -> Result<Option<AnnotatedSegment>> {
        Err(DataError::unimplemented(format!(
            "{} does not restrict features on {} to a range",
            self.source_type(),
            segment_id
        )))
    }

    /// Segment independent lookup by feature and group ids
    async fn features_by_id(
        &self,
        _feature_ids: &[String],
        _group_ids: &[String],
    ) -> Result<Option<Vec<AnnotatedSegment>>> {
        Err(DataError::unimplemented(
            "feature_id / group_id lookup is not supported by this data source",
        ))
    }

    /// Full catalogue of feature types served by this source
    async fn types(&self) -> Result<Vec<FeatureType>>;

    /// Number of features of `feature_type` across the whole source, or
    /// `None` when the source cannot count them
    async fn total_count_for_type(&self, _feature_type: &FeatureType) -> Result<Option<u64>> {
        Ok(None)
    }

    /// URL describing `id` for the given link field
    async fn link_url(&self, field: LinkField, _id: &str) -> Result<Url> {
        Err(DataError::unimplemented(format!(
            "link command is not implemented for field {}",
            field
        )))
    }

    /// Complete sequence of a segment (reference sources)
    async fn sequence(&self, _segment_id: &str) -> Result<Option<Sequence>> {
        Err(DataError::unimplemented(
            "sequence retrieval is only available from reference sources",
        ))
    }

    /// Sequence restricted to `[start, stop]` (range-handling reference sources)
    async fn sequence_in_range(
        &self,
        _segment_id: &str,
        _start: u64,
        _stop: u64,
    ) -> Result<Option<Sequence>> {
        Err(DataError::unimplemented(
            "range restricted sequence retrieval is not supported by this data source",
        ))
    }

    /// Top-level segments (reference sources)
    async fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        Err(DataError::unimplemented(
            "entry points are only available from reference sources",
        ))
    }

    /// Version of the entry point list (reference sources)
    async fn entry_point_version(&self) -> Result<Option<String>> {
        Err(DataError::unimplemented(
            "entry points are only available from reference sources",
        ))
    }

    /// Release any resources held by the source
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl_downcast!(DataSource);

#[cfg(test)]
mod tests {
    use super::*;

    struct AnnotationOnly;

    #[async_trait]
    impl DataSource for AnnotationOnly {
        fn source_type(&self) -> &'static str {
            "annotation-only"
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::Annotation]
        }

        async fn features(&self, _segment_id: &str) -> Result<Option<AnnotatedSegment>> {
            Ok(None)
        }

        async fn types(&self) -> Result<Vec<FeatureType>> {
            Ok(vec![FeatureType::new("exon")])
        }
    }

    #[tokio::test]
    async fn test_defaults_report_unimplemented() {
        let source = AnnotationOnly;
        assert!(source.supports(Capability::Annotation));
        assert!(!source.supports(Capability::Reference));

        assert!(matches!(
            source.sequence("chr1").await,
            Err(DataError::UnimplementedFeature(_))
        ));
        assert!(matches!(
            source.features_in_range("chr1", 1, 10).await,
            Err(DataError::UnimplementedFeature(_))
        ));
        assert!(matches!(
            source.link_url(LinkField::Feature, "f1").await,
            Err(DataError::UnimplementedFeature(_))
        ));
        assert_eq!(
            source
                .total_count_for_type(&FeatureType::new("exon"))
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_downcast() {
        let source: Box<dyn DataSource> = Box::new(AnnotationOnly);
        assert!(source.downcast_ref::<AnnotationOnly>().is_some());
    }
}
