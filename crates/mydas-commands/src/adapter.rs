//! Picks the retrieval call a data source should receive for a segment
//! query, based on the capabilities it declares

use crate::parser::SegmentQuery;
use mydas_query::{
    AnnotatedSegment, Capability, DataError, DataSource, FeatureType, LinkField, LoadedSource,
    Sequence,
};
use tracing::debug;

/// Cache key of a features retrieval
pub fn features_key(source_id: &str, query: &SegmentQuery, range_handling: bool) -> String {
    if range_handling {
        format!("{}_FEATURES_{}", source_id, query)
    } else {
        format!("{}_FEATURES_{}", source_id, query.segment_id())
    }
}

/// Cache key of a sequence retrieval
pub fn sequence_key(source_id: &str, query: &SegmentQuery, range_handling: bool) -> String {
    if range_handling {
        format!("{}_SEQUENCE_{}", source_id, query)
    } else {
        format!("{}_SEQUENCE_{}", source_id, query.segment_id())
    }
}

pub fn all_types_key(source_id: &str) -> String {
    format!("{}_ALL_TYPES", source_id)
}

pub fn type_count_key(source_id: &str, feature_type: &FeatureType) -> String {
    format!(
        "{}_TYPECOUNT_ID_{}_CAT_{}_METHOD_{}",
        source_id,
        feature_type.id,
        feature_type.category.as_deref().unwrap_or("null"),
        feature_type.method.as_deref().unwrap_or("null")
    )
}

pub fn link_key(source_id: &str, field: LinkField, id: &str) -> String {
    format!("{}_LINK_{}_{}", source_id, field, id)
}

/// Capability aware view of one loaded data source
#[derive(Clone, Copy)]
pub struct BackendAdapter<'a> {
    loaded: &'a LoadedSource,
}

impl<'a> BackendAdapter<'a> {
    pub fn new(loaded: &'a LoadedSource) -> Self {
        Self { loaded }
    }

    pub fn loaded(&self) -> &'a LoadedSource {
        self.loaded
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.loaded.source.as_ref()
    }

    pub fn id(&self) -> &'a str {
        self.loaded.id()
    }

    pub fn is_reference(&self) -> bool {
        self.source().supports(Capability::Reference)
    }

    /// Whether features come back restricted to the requested range
    pub fn restricts_features(&self) -> bool {
        self.source().supports(Capability::RangeHandling)
    }

    /// Whether sequences come back restricted to the requested range
    pub fn restricts_sequences(&self) -> bool {
        self.is_reference() && self.source().supports(Capability::RangeHandling)
    }

    pub fn features_key(&self, query: &SegmentQuery) -> String {
        features_key(self.id(), query, self.restricts_features())
    }

    pub fn sequence_key(&self, query: &SegmentQuery) -> String {
        sequence_key(self.id(), query, self.restricts_sequences())
    }

    /// Features for `query`. A source that returns nothing is reported as
    /// not knowing the segment.
    pub async fn features(&self, query: &SegmentQuery) -> Result<AnnotatedSegment, DataError> {
        let segment = match query.range() {
            Some((start, stop)) if self.restricts_features() => {
                self.source()
                    .features_in_range(query.segment_id(), start, stop)
                    .await?
            }
            _ => self.source().features(query.segment_id()).await?,
        };

        debug!("Retrieved features for {} from {}", query, self.id());
        segment.ok_or_else(|| missing_segment(query))
    }

    /// Sequence for `query`, with the same treatment of empty results as
    /// [`BackendAdapter::features`]
    pub async fn sequence(&self, query: &SegmentQuery) -> Result<Sequence, DataError> {
        let sequence = match query.range() {
            Some((start, stop)) if self.restricts_sequences() => {
                self.source()
                    .sequence_in_range(query.segment_id(), start, stop)
                    .await?
            }
            _ => self.source().sequence(query.segment_id()).await?,
        };

        debug!("Retrieved sequence for {} from {}", query, self.id());
        sequence.ok_or_else(|| missing_segment(query))
    }
}

fn missing_segment(query: &SegmentQuery) -> DataError {
    DataError::bad_reference(query.segment_id(), "Segment cannot be found.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        let query = SegmentQuery::with_range("chr1", 100, 200).unwrap();
        assert_eq!(features_key("ens", &query, true), "ens_FEATURES_chr1:100,200");
        assert_eq!(features_key("ens", &query, false), "ens_FEATURES_chr1");
        assert_eq!(sequence_key("ens", &query, false), "ens_SEQUENCE_chr1");
        assert_eq!(all_types_key("ens"), "ens_ALL_TYPES");
        assert_eq!(
            type_count_key("ens", &FeatureType::new("exon").with_method("blast")),
            "ens_TYPECOUNT_ID_exon_CAT_null_METHOD_blast"
        );
        assert_eq!(link_key("ens", LinkField::Feature, "f1"), "ens_LINK_feature_f1");
    }
}
